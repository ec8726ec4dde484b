//! What a journal turns into: transactions made of postings, with exact amounts

pub use money::{format_amount, format_exact, is_exact_decimal, Amount, DISPLAY_DECIMALS};
pub use transaction::{Posting, Transaction};

mod money;
mod transaction;
