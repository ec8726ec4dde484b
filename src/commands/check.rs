use std::error;
use std::fmt;

use colored::Colorize;
use log::debug;

use crate::models::Transaction;
use crate::{CommonOpts, Error, Parser};

/// The journal has problems; they have already been printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckFailed {
    pub errors: usize,
}

impl error::Error for CheckFailed {}
impl fmt::Display for CheckFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors {
            1 => write!(f, "1 error found"),
            n => write!(f, "{} errors found", n),
        }
    }
}

/// Parses the input file and prints its errors
///
/// Stops at the first error unless `--keep-going` is given.
pub fn execute(options: &CommonOpts) -> Result<(), CheckFailed> {
    let parser = Parser::new(options.parser_options());
    let path = &options.input_file;
    debug!("Checking {:?} with {:?}", path, parser.options());

    let (transactions, errors) = if options.keep_going {
        match parser.stream_file(path) {
            Ok(stream) => stream.collect(),
            Err(e) => (vec![], vec![e]),
        }
    } else {
        match parser.parse_file(path) {
            Ok(transactions) => (transactions, vec![]),
            Err(e) => (vec![], vec![e]),
        }
    };

    if options.verbose {
        print_transactions(&transactions);
    }
    for err in errors.iter() {
        eprintln!("{}", describe(err));
    }

    let name = path.to_string_lossy();
    if errors.is_empty() {
        println!(
            "Input file {} is {}",
            name.bold(),
            "OK".bright_green().bold()
        );
        Ok(())
    } else {
        println!("Input file {} is {}", name.bold(), "KO".bright_red().bold());
        Err(CheckFailed {
            errors: errors.len(),
        })
    }
}

fn print_transactions(transactions: &[Transaction]) {
    for transaction in transactions {
        println!("{}\n", transaction);
    }
}

fn describe(err: &Error) -> String {
    let message = err.to_string();
    if err.is_fatal() {
        format!("{}", message.bright_red().bold())
    } else {
        format!("{}", message.red())
    }
}
