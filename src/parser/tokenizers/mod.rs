//! Tokenizers for the parts of a block
pub(crate) mod comment;
pub(crate) mod payee;
pub(crate) mod transaction;
