use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Footnote markers such as `※1` that precede a figure.
static FOOTNOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"※[0-9]+").unwrap());
static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Glyph used by Japanese filings in place of a leading minus sign.
pub const MINUS_GLYPH: char = '△';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Nothing numeric left once separators and markers are gone. Callers treat
    /// this as an empty cell.
    #[error("no digits in amount text {0:?}")]
    NoDigits(String),
    #[error("amount {0:?} does not fit in a signed 64-bit integer")]
    OutOfRange(String),
}

impl AmountError {
    pub fn is_absent(&self) -> bool {
        matches!(self, AmountError::NoDigits(_))
    }
}

/// Converts the display text of a statement cell into a signed integer in the
/// filing's own unit.
///
/// Thousands separators and `※n` footnote markers are dropped, the first run
/// of digits is the magnitude, and a `△` anywhere in the cell negates it.
pub fn normalize_amount(text: &str) -> Result<i64, AmountError> {
    let without_commas = text.replace(',', "");
    let cleaned = FOOTNOTE_RE.replace_all(&without_commas, "");
    let negative = cleaned.contains(MINUS_GLYPH);

    let digits = DIGITS_RE
        .find(&cleaned)
        .map(|m| m.as_str())
        .ok_or_else(|| AmountError::NoDigits(text.to_string()))?;

    let literal = if negative {
        format!("-{}", digits)
    } else {
        digits.to_string()
    };

    literal
        .parse::<i64>()
        .map_err(|_| AmountError::OutOfRange(text.to_string()))
}
