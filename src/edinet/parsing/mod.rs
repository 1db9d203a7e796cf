pub mod amount;
pub mod fragment;
pub mod table;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use amount::{normalize_amount, AmountError};
pub use fragment::{security_code, Fragment, FragmentSelector, PatternSelector};
pub use table::{format_fragment, parse_rows};
pub use types::{ParsedRow, Row, TitleValue};
