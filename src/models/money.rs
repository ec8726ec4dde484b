use num::rational::BigRational;
use num::{BigInt, One, Signed, Zero};

/// Amounts are kept as exact rationals
///
/// It is important that calculations are not done with floats but with rational numbers so that
/// everything adds up correctly: a conversion factor of `10/3` multiplied back by `3` is exactly
/// `10`, which is what lets a transaction sum to exactly zero.
pub type Amount = BigRational;

/// Decimal places shown for amounts that have no finite decimal expansion
pub const DISPLAY_DECIMALS: usize = 8;

/// Renders an amount as a decimal string
///
/// Amounts whose denominator divides a power of ten (up to [`DISPLAY_DECIMALS`] places) are
/// written exactly, the rest are rounded half away from zero.
/// ```rust
/// # use tally::models::format_amount;
/// # use num::rational::BigRational;
/// # use num::BigInt;
/// let third = BigRational::new(BigInt::from(1), BigInt::from(3));
/// assert_eq!(format_amount(&third), "0.33333333");
/// let half = BigRational::new(BigInt::from(-1), BigInt::from(2));
/// assert_eq!(format_amount(&half), "-0.5");
/// ```
pub fn format_amount(amount: &Amount) -> String {
    let (decimals, power) = decimal_places(amount);
    let scaled = (amount * BigRational::from_integer(power)).round().to_integer();
    let sign = if scaled.is_negative() { "-" } else { "" };
    let digits = scaled.abs().to_string();
    if decimals == 0 {
        return format!("{}{}", sign, digits);
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (integer_part, decimal_part) = padded.split_at(padded.len() - decimals);
    format!("{}{}.{}", sign, integer_part, decimal_part)
}

/// Renders an amount so that it reads back as the same value
///
/// Same as [`format_amount`] when that is exact, otherwise a `(numerator/denominator)`
/// expression, e.g. `(10/3)`.
pub fn format_exact(amount: &Amount) -> String {
    if is_exact_decimal(amount) {
        format_amount(amount)
    } else {
        format!("({}/{})", amount.numer(), amount.denom())
    }
}

/// Whether [`format_amount`] writes the amount without rounding
pub fn is_exact_decimal(amount: &Amount) -> bool {
    let (_, power) = decimal_places(amount);
    (power % amount.denom()).is_zero()
}

/// Smallest number of decimal places, capped at [`DISPLAY_DECIMALS`], and the matching power of ten
fn decimal_places(amount: &Amount) -> (usize, BigInt) {
    let ten = BigInt::from(10);
    let mut decimals = 0;
    let mut power = BigInt::one();
    while !(&power % amount.denom()).is_zero() && decimals < DISPLAY_DECIMALS {
        power *= &ten;
        decimals += 1;
    }
    (decimals, power)
}
