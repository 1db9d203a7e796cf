use super::amount::{normalize_amount, AmountError};
use serde::{Deserialize, Serialize};

/// Previous and current period figures for one line item.
///
/// A zero on both sides reads as "not reported"; filings that genuinely
/// report zero for a line item are indistinguishable from a missing row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleValue {
    pub previous: i64,
    pub current: i64,
}

impl TitleValue {
    pub fn new(previous: i64, current: i64) -> Self {
        Self { previous, current }
    }

    pub fn is_present(&self) -> bool {
        self.previous != 0 || self.current != 0
    }
}

/// One statement table line, still holding the cell text as rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub title: String,
    pub previous: String,
    pub current: String,
}

impl ParsedRow {
    pub fn title_value(&self) -> Result<TitleValue, AmountError> {
        Ok(TitleValue {
            previous: normalize_amount(&self.previous)?,
            current: normalize_amount(&self.current)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Data(ParsedRow),
    /// A row with a single text segment, typically the `（単位：百万円）` caption.
    Unit(String),
}
