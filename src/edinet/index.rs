use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{4}/[0-9]{2}/[0-9]{2})－([0-9]{4}/[0-9]{2}/[0-9]{2})").unwrap()
});

/// Report forms that carry annual statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportForm {
    /// 有価証券報告書
    SecuritiesReport,
    /// 訂正有価証券報告書
    AmendedSecuritiesReport,
}

impl ReportForm {
    pub fn of(form_code: &str, doc_type_code: &str) -> Option<Self> {
        match (form_code, doc_type_code) {
            ("030000", "120") => Some(ReportForm::SecuritiesReport),
            ("030001", "130") => Some(ReportForm::AmendedSecuritiesReport),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexResponse {
    pub metadata: IndexMetadata,
    #[serde(default)]
    pub results: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexMetadata {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// One row of the daily document list. EDINET sends `null` for most fields
/// that do not apply to a document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(rename = "docID", alias = "docId")]
    pub doc_id: String,
    pub edinet_code: Option<String>,
    pub sec_code: Option<String>,
    pub filer_name: Option<String>,
    pub form_code: Option<String>,
    pub doc_type_code: Option<String>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub doc_description: Option<String>,
}

/// Everything the register needs to know about a filing before reading it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingDescriptor {
    pub date_key: String,
    pub doc_id: String,
    pub edinet_code: String,
    pub sec_code: String,
    pub filer_name: String,
    pub form_code: String,
    pub doc_type_code: String,
    pub period_start: String,
    pub period_end: String,
    pub doc_description: String,
}

impl FilingDescriptor {
    pub fn from_entry(entry: IndexEntry, date_key: &str) -> Self {
        let mut descriptor = Self {
            date_key: date_key.to_string(),
            doc_id: entry.doc_id,
            edinet_code: entry.edinet_code.unwrap_or_default(),
            sec_code: entry.sec_code.unwrap_or_default(),
            filer_name: entry.filer_name.unwrap_or_default(),
            form_code: entry.form_code.unwrap_or_default(),
            doc_type_code: entry.doc_type_code.unwrap_or_default(),
            period_start: entry.period_start.unwrap_or_default(),
            period_end: entry.period_end.unwrap_or_default(),
            doc_description: entry.doc_description.unwrap_or_default(),
        };
        descriptor.fill_period();
        descriptor
    }

    pub fn form(&self) -> Option<ReportForm> {
        ReportForm::of(&self.form_code, &self.doc_type_code)
    }

    /// Fills missing period bounds from the document description. Bounds the
    /// index already supplied are kept.
    pub fn fill_period(&mut self) {
        if !self.period_start.is_empty() && !self.period_end.is_empty() {
            return;
        }
        if let Some((start, end)) = derive_period(&self.doc_description) {
            if self.period_start.is_empty() {
                self.period_start = start;
            }
            if self.period_end.is_empty() {
                self.period_end = end;
            }
        }
    }
}

/// Extracts `YYYY-MM-DD` bounds from descriptions such as
/// `有価証券報告書－第80期(2023/04/01－2024/03/31)`.
pub fn derive_period(description: &str) -> Option<(String, String)> {
    let caps = PERIOD_RE.captures(description)?;
    Some((caps[1].replace('/', "-"), caps[2].replace('/', "-")))
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Keeps the annual and amended annual reports of one index day.
pub fn annual_reports(date: NaiveDate, response: IndexResponse) -> Vec<FilingDescriptor> {
    let key = date_key(date);
    response
        .results
        .into_iter()
        .filter(|entry| {
            ReportForm::of(
                entry.form_code.as_deref().unwrap_or_default(),
                entry.doc_type_code.as_deref().unwrap_or_default(),
            )
            .is_some()
        })
        .map(|entry| FilingDescriptor::from_entry(entry, &key))
        .collect()
}
