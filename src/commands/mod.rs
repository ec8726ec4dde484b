//! Commands of the command line app
pub mod check;
