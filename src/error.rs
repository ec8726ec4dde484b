use std::error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

/// Something in a block could not be understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    /// The first line of the block has no space to split the date from the payee
    PayeeLine(String),
    /// The date token does not match any known layout
    Date { date: String, reason: String },
    /// The posting line does not follow `NAME  [CURRENCY] AMOUNT [@@ X | @ X]`
    Posting(String),
    /// A number could not be read
    Number(String),
    /// A parenthesised amount could not be parsed or evaluated
    Expression { expression: String, reason: String },
}

impl error::Error for ParserError {}
impl Display for ParserError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::PayeeLine(line) => write!(f, "unable to parse payee line: {}", line),
            ParserError::Date { date, reason } => {
                write!(f, "unable to parse date({}): {}", date, reason)
            }
            ParserError::Posting(line) => write!(f, "invalid posting: {:?}", line),
            ParserError::Number(number) => write!(f, "invalid number: {:?}", number),
            ParserError::Expression { expression, reason } => {
                write!(f, "invalid amount expression {}: {}", expression, reason)
            }
        }
    }
}

/// The postings of a transaction do not add up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    NeedAtLeastTwoPostings,
    NoEmptyPosting,
    TooManyEmptyPostings(usize),
}

impl error::Error for LedgerError {}
impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NeedAtLeastTwoPostings => write!(f, "need at least two postings"),
            LedgerError::NoEmptyPosting => write!(
                f,
                "unable to balance transaction: no empty account to place extra balance"
            ),
            LedgerError::TooManyEmptyPostings(_) => {
                write!(f, "unable to balance transaction: more than one account empty")
            }
        }
    }
}

/// Why a block could not become a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    Parser(ParserError),
    Ledger(LedgerError),
}

impl From<ParserError> for TransactionError {
    fn from(error: ParserError) -> Self {
        TransactionError::Parser(error)
    }
}

impl From<LedgerError> for TransactionError {
    fn from(error: LedgerError) -> Self {
        TransactionError::Ledger(error)
    }
}

impl error::Error for TransactionError {}
impl Display for TransactionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::Parser(e) => write!(f, "{}", e),
            TransactionError::Ledger(e) => write!(f, "{}", e),
        }
    }
}

/// Why an include directive could not be honoured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeError {
    NotFound,
    InvalidPattern(String),
    Loop(PathBuf),
}

impl error::Error for IncludeError {}
impl Display for IncludeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IncludeError::NotFound => write!(f, "not found"),
            IncludeError::InvalidPattern(reason) => write!(f, "{}", reason),
            IncludeError::Loop(path) => write!(f, "include loop through {}", path.display()),
        }
    }
}

/// Errors reported while parsing a journal
///
/// `Transaction` errors only cost the offending block; the others abort the
/// whole parse (see [`Error::is_fatal`]).
#[derive(Debug)]
pub enum Error {
    Transaction {
        source_name: String,
        line: usize,
        cause: TransactionError,
    },
    Include {
        source_name: String,
        line: usize,
        pattern: String,
        cause: IncludeError,
    },
    CannotReadFile {
        path: PathBuf,
        cause: io::Error,
    },
}

impl Error {
    pub(crate) fn transaction<T: Into<TransactionError>>(
        source_name: &str,
        line: usize,
        cause: T,
    ) -> Error {
        Error::Transaction {
            source_name: source_name.to_string(),
            line,
            cause: cause.into(),
        }
    }

    pub(crate) fn include(source_name: &str, line: usize, pattern: &str, cause: IncludeError) -> Error {
        Error::Include {
            source_name: source_name.to_string(),
            line,
            pattern: pattern.to_string(),
            cause,
        }
    }

    pub(crate) fn cannot_read<P: Into<PathBuf>>(path: P, cause: io::Error) -> Error {
        Error::CannotReadFile {
            path: path.into(),
            cause,
        }
    }

    /// Fatal errors abort the parse; the rest only skip one block
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Transaction { .. })
    }

    /// 1-based line the error refers to, 0 when it is about a whole file
    pub fn line(&self) -> usize {
        match self {
            Error::Transaction { line, .. } | Error::Include { line, .. } => *line,
            Error::CannotReadFile { .. } => 0,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transaction {
                source_name,
                line,
                cause,
            } => write!(
                f,
                "{}:{}: unable to parse transaction: {}",
                source_name, line, cause
            ),
            Error::Include {
                source_name,
                line,
                pattern,
                cause,
            } => write!(
                f,
                "{}:{}: unable to include file({}): {}",
                source_name, line, pattern, cause
            ),
            Error::CannotReadFile { path, cause } => {
                write!(f, "{}: unable to read file: {}", path.display(), cause)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Transaction { cause, .. } => match cause {
                TransactionError::Parser(e) => Some(e),
                TransactionError::Ledger(e) => Some(e),
            },
            Error::Include { cause, .. } => Some(cause),
            Error::CannotReadFile { cause, .. } => Some(cause),
        }
    }
}
