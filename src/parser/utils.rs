//! This module contains auxiliary parsers

use chrono::NaiveDate;
use num::{BigInt, BigRational};
use std::str::FromStr;

use crate::ParserError;

/// Date layouts tried when the cached one does not fit, in this order
pub(crate) const DATE_LAYOUTS: &[&str] = &[
    "%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d", "%m/%d/%Y", "%d.%m.%Y", "%d-%m-%Y",
];

/// Parses a signed decimal literal into an exact rational
pub(crate) fn parse_rational(number: &str) -> Result<BigRational, ParserError> {
    let invalid = || ParserError::Number(number.to_string());
    let (negative, unsigned) = match number.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, number.strip_prefix('+').unwrap_or(number)),
    };

    let mut num = String::new();
    let mut den = "1".to_string();
    let mut decimal = false;
    for c in unsigned.chars() {
        if c == '.' {
            if decimal {
                return Err(invalid());
            }
            decimal = true
        } else if c.is_ascii_digit() {
            num.push(c);
            if decimal {
                den.push('0')
            };
        } else {
            return Err(invalid());
        }
    }
    if num.is_empty() {
        return Err(invalid());
    }

    let numer = BigInt::from_str(num.as_str()).map_err(|_| invalid())?;
    let denom = BigInt::from_str(den.as_str()).map_err(|_| invalid())?;
    let value = BigRational::new(numer, denom);
    Ok(if negative { -value } else { value })
}

/// Date parser that remembers what worked last time
///
/// Journals use one date layout throughout, so the layout that parsed the previous date is tried
/// first, and a date string identical to the previous one is not parsed again. The state belongs
/// to a single parse of a single source.
#[derive(Debug, Clone, Default)]
pub(crate) struct DateParser {
    layout: Option<&'static str>,
    previous: Option<(String, Result<NaiveDate, ParserError>)>,
}

impl DateParser {
    pub(crate) fn new() -> DateParser {
        DateParser::default()
    }

    pub(crate) fn parse(&mut self, date: &str) -> Result<NaiveDate, ParserError> {
        if let Some((previous, result)) = &self.previous {
            if previous == date {
                return result.clone();
            }
        }
        let result = self.try_layouts(date);
        self.previous = Some((date.to_string(), result.clone()));
        result
    }

    fn try_layouts(&mut self, date: &str) -> Result<NaiveDate, ParserError> {
        let mut first_error = None;
        let cached = self.layout.into_iter();
        for layout in cached.chain(DATE_LAYOUTS.iter().copied()) {
            match NaiveDate::parse_from_str(date, layout) {
                Ok(parsed) => {
                    self.layout = Some(layout);
                    return Ok(parsed);
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e.to_string());
                    }
                }
            }
        }
        Err(ParserError::Date {
            date: date.to_string(),
            reason: first_error.unwrap_or_else(|| "unknown date layout".to_string()),
        })
    }

    #[cfg(test)]
    fn layout(&self) -> Option<&'static str> {
        self.layout
    }
}
