use chrono::NaiveDate;

use crate::parser::utils::DateParser;
use crate::ParserError;

/// What the first line of a block says the block is
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Header<'a> {
    /// `account <name>`, nothing to do
    Account,
    /// `include <glob>`
    Include { pattern: &'a str },
    Transaction { date: NaiveDate, payee: &'a str },
}

/// Parses the payee line (comment already removed)
///
/// The line is split on its first space: the left part is either a directive or a date, the
/// right part the directive argument or the payee.
pub(crate) fn parse<'a>(line: &'a str, dates: &mut DateParser) -> Result<Header<'a>, ParserError> {
    let (token, rest) = line
        .split_once(' ')
        .ok_or_else(|| ParserError::PayeeLine(line.to_string()))?;
    match token {
        "account" => Ok(Header::Account),
        "include" => Ok(Header::Include {
            pattern: rest.trim(),
        }),
        date => Ok(Header::Transaction {
            date: dates.parse(date)?,
            payee: rest.trim(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_header() {
        let mut dates = DateParser::new();
        assert_eq!(
            parse("1970/01/01 Payee 5", &mut dates),
            Ok(Header::Transaction {
                date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
                payee: "Payee 5"
            })
        );
    }

    #[test]
    fn directives() {
        let mut dates = DateParser::new();
        assert_eq!(parse("account Expense/test", &mut dates), Ok(Header::Account));
        assert_eq!(
            parse("include  *.journal", &mut dates),
            Ok(Header::Include {
                pattern: "*.journal"
            })
        );
    }

    #[test]
    fn no_space() {
        let mut dates = DateParser::new();
        assert_eq!(
            parse("1970/01/01Payee", &mut dates).unwrap_err().to_string(),
            "unable to parse payee line: 1970/01/01Payee"
        );
    }

    #[test]
    fn bad_date() {
        let mut dates = DateParser::new();
        assert!(matches!(
            parse("1970/02/30 Error", &mut dates),
            Err(ParserError::Date { .. })
        ));
    }
}
