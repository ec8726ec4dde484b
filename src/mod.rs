//! Parser for plain text accounting journals
//!
//! ```
//! let transactions = tally::parse_str(
//!     "2021/03/01 Groceries
//!     Expenses:Food  (12.5 * 2)
//!     Assets:Bank
//! ",
//! )
//! .unwrap();
//! assert_eq!(transactions.len(), 1);
//! assert!(transactions[0].is_balanced());
//! ```
extern crate pest;
#[macro_use]
extern crate pest_derive;

mod app;
pub mod commands;
mod error;
pub mod models;
pub mod parser;

pub use app::{run_app, CommonOpts, InitFileError};
pub use error::{Error, IncludeError, LedgerError, ParserError, TransactionError};
pub use parser::{
    parse_file, parse_reader, parse_str, parse_stream, CancellationToken, ParseStream, Parser,
    ParserOptions,
};
