use std::fmt;
use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use num::Zero;

use crate::models::money::{format_exact, Amount};
use crate::LedgerError;

/// One balanced economic event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub payee: String,
    /// Inline comment on the header line, including its `;`
    pub payee_comment: String,
    /// Comment lines in the order they were found
    pub comments: Vec<String>,
    pub postings: Vec<Posting>,
}

/// One account line of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub account: String,
    /// Empty when no currency was written
    pub currency: String,
    /// Zero for an empty posting until the balance is placed in it
    pub amount: Amount,
    /// `@@` total, in the currency of the other side
    pub converted_amount: Option<Amount>,
    /// `@` rate, written or inferred
    pub conversion_factor: Option<Amount>,
    pub comment: String,
}

impl Posting {
    pub fn new(account: &str) -> Posting {
        Posting {
            account: account.to_string(),
            currency: String::new(),
            amount: Amount::zero(),
            converted_amount: None,
            conversion_factor: None,
            comment: String::new(),
        }
    }

    /// A posting with no amount, waiting for the balance of the transaction
    ///
    /// A `@@` total or a zero rate fixes the contribution whatever the amount, so such a posting
    /// cannot take the balance.
    pub fn is_empty(&self) -> bool {
        self.amount.is_zero()
            && self.converted_amount.is_none()
            && !matches!(&self.conversion_factor, Some(factor) if factor.is_zero())
    }

    pub fn has_conversion(&self) -> bool {
        self.converted_amount.is_some() || self.conversion_factor.is_some()
    }

    /// What the posting adds to the transaction, in the common unit
    pub fn contribution(&self) -> Amount {
        match (&self.converted_amount, &self.conversion_factor) {
            (Some(converted), _) => -converted.clone(),
            (None, Some(factor)) => &self.amount * factor,
            (None, None) => self.amount.clone(),
        }
    }
}

impl Transaction {
    pub fn new(date: NaiveDate, payee: &str) -> Transaction {
        Transaction {
            date,
            payee: payee.to_string(),
            payee_comment: String::new(),
            comments: vec![],
            postings: vec![],
        }
    }

    /// Sum of all the postings in the common unit
    pub fn total(&self) -> Amount {
        self.postings
            .iter()
            .fold(Amount::zero(), |acc, p| acc + p.contribution())
    }

    pub fn is_balanced(&self) -> bool {
        self.total().is_zero()
    }

    /// Balances the transaction
    ///
    /// The steps are:
    /// 1. When the postings use exactly two currencies, and at most one of them carries an
    ///    explicit conversion, a conversion factor is inferred for the other one.
    /// 2. The postings are added up in the common unit.
    /// 3. Whatever is left over goes to the only empty posting. No empty posting, or more than
    ///    one, is an error unless there is nothing left over.
    pub fn balance(&mut self) -> Result<(), LedgerError> {
        if self.postings.len() < 2 {
            return Err(LedgerError::NeedAtLeastTwoPostings);
        }

        infer_conversion_factor(&mut self.postings);

        let mut total = Amount::zero();
        let mut empties = 0;
        let mut fill_index = 0;
        for (i, p) in self.postings.iter().enumerate() {
            if p.is_empty() {
                empties += 1;
                fill_index = i;
            }
            total += p.contribution();
        }

        if total.is_zero() {
            return Ok(());
        }
        match empties {
            0 => Err(LedgerError::NoEmptyPosting),
            1 => {
                let fill = &mut self.postings[fill_index];
                fill.amount = match &fill.conversion_factor {
                    Some(factor) if !factor.is_zero() => -total / factor,
                    _ => -total,
                };
                Ok(())
            }
            n => Err(LedgerError::TooManyEmptyPostings(n)),
        }
    }
}

/// Postings grouped by currency, in the order each currency is first seen
///
/// Postings with no currency are left out.
fn currency_groups(postings: &[Posting]) -> Vec<(&str, Vec<usize>)> {
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (i, p) in postings.iter().enumerate() {
        if p.currency.is_empty() {
            continue;
        }
        match groups.iter_mut().find(|(c, _)| *c == p.currency) {
            Some((_, members)) => members.push(i),
            None => groups.push((p.currency.as_str(), vec![i])),
        }
    }
    groups
}

/// Sets the conversion factor that makes a two currency transaction add up
///
/// The reference group is the one that already converts, or the first one seen if neither does.
/// Every posting of the other group without its own conversion gets the factor.
fn infer_conversion_factor(postings: &mut [Posting]) {
    let groups = currency_groups(postings);
    if groups.len() != 2 {
        return;
    }
    let converts = |members: &[usize]| members.iter().any(|&i| postings[i].has_conversion());
    let (base, other) = match (converts(&groups[0].1), converts(&groups[1].1)) {
        (true, true) => return,
        (false, true) => (&groups[1].1, &groups[0].1),
        _ => (&groups[0].1, &groups[1].1),
    };

    let base_sum = base
        .iter()
        .fold(Amount::zero(), |acc, &i| acc + postings[i].contribution());
    let other_sum = other
        .iter()
        .fold(Amount::zero(), |acc, &i| acc + postings[i].amount.clone());
    if other_sum.is_zero() || (&base_sum + &other_sum).is_zero() {
        return;
    }

    let factor = -base_sum / other_sum;
    let other = other.clone();
    for i in other {
        let p = &mut postings[i];
        if !p.has_conversion() {
            p.conversion_factor = Some(factor.clone());
        }
    }
}

impl Display for Posting {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut amount = String::new();
        if !self.currency.is_empty() {
            amount.push_str(&self.currency);
            amount.push(' ');
        }
        amount.push_str(&format_exact(&self.amount));
        if let Some(converted) = &self.converted_amount {
            amount.push_str(&format!(" @@ {}", format_exact(converted)));
        } else if let Some(factor) = &self.conversion_factor {
            amount.push_str(&format!(" @ {}", format_exact(factor)));
        }
        let line = format!("{:40}  {:>20}", self.account, amount);
        if self.comment.is_empty() {
            write!(f, "{}", line.trim_end())
        } else {
            write!(f, "{}  {}", line, self.comment)
        }
    }
}

impl Display for Transaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for comment in self.comments.iter() {
            writeln!(f, "{}", comment)?;
        }
        write!(f, "{} {}", self.date.format("%Y/%m/%d"), self.payee)?;
        if !self.payee_comment.is_empty() {
            write!(f, "  {}", self.payee_comment)?;
        }
        for p in self.postings.iter() {
            write!(f, "\n\t{}", p)?;
        }
        Ok(())
    }
}
