use crate::edinet::statement::ArtifactKind;
use anyhow::Result;
use mime::Mime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static STATEMENT_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([^/]+)/(BS|PL|CF)/([^/]+?)-([^/-]+)-(BS|PL|CF)-from-([0-9]{4}-[0-9]{2}-[0-9]{2})-to-([0-9]{4}-[0-9]{2}-[0-9]{2})\.(json|html)$",
    )
    .unwrap()
});

static FUNDAMENTALS_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([^/]+)/Fundamentals/([^/]+?)-fundamentals-from-([0-9]{4}-[0-9]{2}-[0-9]{2})-to-([0-9]{4}-[0-9]{2}-[0-9]{2})\.json$",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactFormat {
    Json,
    Html,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Html => "html",
        }
    }

    pub fn content_type(&self) -> Mime {
        match self {
            ArtifactFormat::Json => mime::APPLICATION_JSON,
            ArtifactFormat::Html => mime::TEXT_HTML_UTF_8,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(ArtifactFormat::Json),
            "html" => Some(ArtifactFormat::Html),
            _ => None,
        }
    }
}

/// Object key of a published artifact.
///
/// Statement keys carry the document id so that an amended filing for the
/// same period gets a distinct key; fundamentals keys do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub entity: String,
    pub doc_id: Option<String>,
    pub kind: ArtifactKind,
    pub period_start: String,
    pub period_end: String,
    pub format: ArtifactFormat,
}

impl ArtifactKey {
    pub fn statement(
        entity: &str,
        doc_id: &str,
        kind: ArtifactKind,
        period_start: &str,
        period_end: &str,
        format: ArtifactFormat,
    ) -> Self {
        Self {
            entity: entity.to_string(),
            doc_id: Some(doc_id.to_string()),
            kind,
            period_start: period_start.to_string(),
            period_end: period_end.to_string(),
            format,
        }
    }

    pub fn fundamentals(entity: &str, period_start: &str, period_end: &str) -> Self {
        Self {
            entity: entity.to_string(),
            doc_id: None,
            kind: ArtifactKind::Fundamentals,
            period_start: period_start.to_string(),
            period_end: period_end.to_string(),
            format: ArtifactFormat::Json,
        }
    }

    /// Listing prefix holding every artifact of this entity and kind.
    pub fn prefix(&self) -> String {
        format!("{}/{}/", self.entity, self.kind)
    }

    pub fn parse(key: &str) -> Option<Self> {
        if let Some(caps) = STATEMENT_KEY_RE.captures(key) {
            if caps[1] != caps[3] || caps[2] != caps[5] {
                return None;
            }
            return Some(Self {
                entity: caps[1].to_string(),
                doc_id: Some(caps[4].to_string()),
                kind: caps[2].parse().ok()?,
                period_start: caps[6].to_string(),
                period_end: caps[7].to_string(),
                format: ArtifactFormat::from_extension(&caps[8])?,
            });
        }
        let caps = FUNDAMENTALS_KEY_RE.captures(key)?;
        if caps[1] != caps[2] {
            return None;
        }
        Some(Self::fundamentals(&caps[1], &caps[3], &caps[4]))
    }

    /// Same entity, artifact, period and format; the document may differ.
    pub fn same_slot(&self, other: &ArtifactKey) -> bool {
        self.entity == other.entity
            && self.kind == other.kind
            && self.period_start == other.period_start
            && self.period_end == other.period_end
            && self.format == other.format
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.doc_id {
            Some(doc_id) => write!(
                f,
                "{entity}/{kind}/{entity}-{doc_id}-{kind}-from-{start}-to-{end}.{ext}",
                entity = self.entity,
                kind = self.kind,
                start = self.period_start,
                end = self.period_end,
                ext = self.format.extension(),
            ),
            None => write!(
                f,
                "{entity}/{kind}/{entity}-{lower}-from-{start}-to-{end}.{ext}",
                entity = self.entity,
                kind = self.kind,
                lower = self.kind.code().to_lowercase(),
                start = self.period_start,
                end = self.period_end,
                ext = self.format.extension(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishDecision {
    /// The exact key is already published.
    Skip,
    Publish,
    /// Publish, then delete these keys for the same period from older filings.
    PublishAndRetire(Vec<String>),
}

/// Decides what to do with a candidate artifact given the keys already
/// published under its prefix.
pub fn should_publish(candidate: &ArtifactKey, existing: &[String]) -> PublishDecision {
    let rendered = candidate.to_string();
    if existing.iter().any(|key| *key == rendered) {
        return PublishDecision::Skip;
    }

    let stale: Vec<String> = existing
        .iter()
        .filter(|key| {
            ArtifactKey::parse(key)
                .map(|parsed| parsed.same_slot(candidate))
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    if stale.is_empty() {
        PublishDecision::Publish
    } else {
        PublishDecision::PublishAndRetire(stale)
    }
}

pub fn render_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_string_pretty(value)?.into_bytes())
}

/// Wraps a formatted statement table in a standalone UTF-8 document.
pub fn render_html(title: &str, table: &str) -> Vec<u8> {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        html_escape::encode_text(title),
        table
    )
    .into_bytes()
}
