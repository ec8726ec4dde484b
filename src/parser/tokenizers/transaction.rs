use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{Amount, Posting, Transaction};
use crate::parser::expressions::eval_expression;
use crate::parser::lines::Line;
use crate::parser::utils::parse_rational;
use crate::{ParserError, TransactionError};

lazy_static! {
    static ref POSTING: Regex = Regex::new(format!("{}{}{}{}{}{}{}",
    r"^(.+?)"                                       , // account
    r"(?:(?:\s{2,}|\t)"                             , // separator
    r"(?:([A-Z]+|\$)\s+)?"                          , // currency
    r"(-?\d+(?:\.\d+)?|\([0-9+\-*/. ]+\))"          , // amount or expression
    r"(?:\s*(?:@@\s*(-?\d+(?:\.\d+)?|\([0-9+\-*/. ]+\))" , // @@ total
    r"|@\s*(-?\d+(?:\.\d+)?|\([0-9+\-*/. ]+\))))?)?" , // or @ rate
    r"\s*$"                                         ,
    ).as_str()).unwrap();
}

/// Parses a posting line (comment already removed)
pub(crate) fn parse_posting(line: &str, comment: &str) -> Result<Posting, ParserError> {
    let invalid = || ParserError::Posting(line.to_string());
    let caps = POSTING.captures(line).ok_or_else(invalid)?;

    let account = caps.get(1).map_or("", |m| m.as_str()).trim_end();
    // The separator is never part of a name: if it is still there the amount was not understood
    if account.contains("  ") || account.contains('\t') {
        return Err(invalid());
    }

    let mut posting = Posting::new(account);
    posting.comment = comment.to_string();
    if let Some(currency) = caps.get(2) {
        posting.currency = currency.as_str().to_string();
    }
    if let Some(amount) = caps.get(3) {
        posting.amount = parse_amount(amount.as_str())?;
    }
    if let Some(converted) = caps.get(4) {
        posting.converted_amount = Some(parse_amount(converted.as_str())?);
    }
    if let Some(factor) = caps.get(5) {
        posting.conversion_factor = Some(parse_amount(factor.as_str())?);
    }
    Ok(posting)
}

/// A plain number or a parenthesised expression
fn parse_amount(text: &str) -> Result<Amount, ParserError> {
    if text.starts_with('(') {
        eval_expression(text)
    } else {
        parse_rational(text)
    }
}

/// Builds and balances the transaction of a block from the lines after its payee line
///
/// On failure, returns the line the error should be reported at along with the cause: the
/// posting line for posting errors, `last_line` for balancing errors.
pub(crate) fn parse(
    date: NaiveDate,
    payee: &str,
    payee_comment: &str,
    lines: &[Line],
    last_line: usize,
    mut comments: Vec<String>,
) -> Result<Transaction, (usize, TransactionError)> {
    let mut transaction = Transaction::new(date, payee);
    transaction.payee_comment = payee_comment.to_string();

    for line in lines {
        if line.text.is_empty() {
            comments.push(line.comment.clone());
            continue;
        }
        let posting =
            parse_posting(&line.text, &line.comment).map_err(|e| (line.number, e.into()))?;
        transaction.postings.push(posting);
    }
    transaction.comments = comments;

    transaction.balance().map_err(|e| (last_line, e.into()))?;
    Ok(transaction)
}
