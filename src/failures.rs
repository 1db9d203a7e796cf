use crate::edinet::ArtifactKind;
use crate::storage::ObjectStore;
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const FAILED_KEY: &str = "failed.json";
pub const INVALID_SUMMARY_KEY: &str = "invalid-summary.json";

/// A filing whose processing hit an error and should be retried later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedReport {
    pub doc_id: String,
    pub register_date: String,
    pub error_msg: String,
}

/// A summary that was extracted but did not pass validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidSummary {
    pub doc_id: String,
    pub register_date: String,
    pub error_msg: String,
    pub company_name: String,
    pub report_type: ArtifactKind,
}

/// What one filing task learned about failures, merged into the shared log
/// when the batch finishes.
#[derive(Debug, Default, Clone)]
pub struct Journal {
    failed: Vec<FailedReport>,
    invalid: Vec<InvalidSummary>,
    recovered: Vec<String>,
    validated: Vec<(String, ArtifactKind)>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, doc_id: &str, date_key: &str, message: impl Into<String>) {
        let error_msg = message.into();
        log::error!("{} ({}): {}", doc_id, date_key, error_msg);
        self.failed.push(FailedReport {
            doc_id: doc_id.to_string(),
            register_date: date_key.to_string(),
            error_msg,
        });
    }

    pub fn invalid(
        &mut self,
        doc_id: &str,
        date_key: &str,
        company_name: &str,
        report_type: ArtifactKind,
    ) {
        self.invalid.push(InvalidSummary {
            doc_id: doc_id.to_string(),
            register_date: date_key.to_string(),
            error_msg: format!("{} summary is incomplete", report_type),
            company_name: company_name.to_string(),
            report_type,
        });
    }

    /// Marks a summary as valid, clearing any earlier invalid entry for it.
    pub fn validated(&mut self, doc_id: &str, report_type: ArtifactKind) {
        self.validated.push((doc_id.to_string(), report_type));
    }

    /// Marks a filing as processed without errors.
    pub fn recovered(&mut self, doc_id: &str) {
        self.recovered.push(doc_id.to_string());
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failures(&self) -> &[FailedReport] {
        &self.failed
    }

    pub fn invalid_summaries(&self) -> &[InvalidSummary] {
        &self.invalid
    }

    pub fn merge(&mut self, other: Journal) {
        self.failed.extend(other.failed);
        self.invalid.extend(other.invalid);
        self.recovered.extend(other.recovered);
        self.validated.extend(other.validated);
    }
}

/// The persisted failure lists.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FailureLog {
    pub failed: Vec<FailedReport>,
    pub invalid: Vec<InvalidSummary>,
}

async fn load_list<T: DeserializeOwned>(store: &dyn ObjectStore, key: &str) -> Result<Vec<T>> {
    match store.get(key).await? {
        Some(body) if !body.is_empty() => serde_json::from_slice(&body)
            .with_context(|| format!("Failed to parse {}", key)),
        _ => Ok(Vec::new()),
    }
}

impl FailureLog {
    pub async fn load(store: &dyn ObjectStore) -> Result<Self> {
        Ok(Self {
            failed: load_list(store, FAILED_KEY).await?,
            invalid: load_list(store, INVALID_SUMMARY_KEY).await?,
        })
    }

    /// Resolved entries are dropped first, then new entries are added unless
    /// the same document (and report type) is already listed.
    pub fn apply(&mut self, journal: Journal) {
        self.failed
            .retain(|report| !journal.recovered.contains(&report.doc_id));
        self.invalid.retain(|entry| {
            !journal
                .validated
                .iter()
                .any(|(doc_id, kind)| *doc_id == entry.doc_id && *kind == entry.report_type)
        });

        for report in journal.failed {
            if !self.failed.iter().any(|f| f.doc_id == report.doc_id) {
                self.failed.push(report);
            }
        }
        for entry in journal.invalid {
            let listed = self
                .invalid
                .iter()
                .any(|i| i.doc_id == entry.doc_id && i.report_type == entry.report_type);
            if !listed {
                self.invalid.push(entry);
            }
        }
    }

    pub async fn flush(&self, store: &dyn ObjectStore) -> Result<()> {
        store
            .put(
                FAILED_KEY,
                serde_json::to_vec_pretty(&self.failed)?,
                &mime::APPLICATION_JSON,
            )
            .await?;
        store
            .put(
                INVALID_SUMMARY_KEY,
                serde_json::to_vec_pretty(&self.invalid)?,
                &mime::APPLICATION_JSON,
            )
            .await?;
        Ok(())
    }
}

/// Serializes read-modify-write cycles on the failure lists.
pub struct FailureRegistry {
    store: Arc<dyn ObjectStore>,
    lock: Mutex<()>,
}

impl FailureRegistry {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub async fn commit(&self, journal: Journal) -> Result<FailureLog> {
        let _guard = self.lock.lock().await;
        let mut failures = FailureLog::load(self.store.as_ref()).await?;
        failures.apply(journal);
        failures.flush(self.store.as_ref()).await?;
        log::info!(
            "Failure log updated: {} failed, {} invalid",
            failures.failed.len(),
            failures.invalid.len()
        );
        Ok(failures)
    }

    pub async fn snapshot(&self) -> Result<FailureLog> {
        let _guard = self.lock.lock().await;
        FailureLog::load(self.store.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edinet::StatementKind;
    use crate::storage::MemoryStore;

    const PL: ArtifactKind = ArtifactKind::Statement(StatementKind::IncomeStatement);
    const CF: ArtifactKind = ArtifactKind::Statement(StatementKind::CashFlow);

    #[test]
    fn test_duplicate_entries_are_not_added() {
        let mut log = FailureLog::default();
        let mut journal = Journal::new();
        journal.fail("S1", "20240625", "first");
        journal.fail("S1", "20240625", "second");
        journal.invalid("S1", "20240625", "A社", PL);
        journal.invalid("S1", "20240625", "A社", CF);
        journal.invalid("S1", "20240625", "A社", PL);
        log.apply(journal);

        assert_eq!(log.failed.len(), 1);
        assert_eq!(log.failed[0].error_msg, "first");
        assert_eq!(log.invalid.len(), 2);
    }

    #[test]
    fn test_resolution_prunes_matching_entries() {
        let mut log = FailureLog::default();
        let mut first = Journal::new();
        first.fail("S1", "20240625", "boom");
        first.fail("S2", "20240625", "boom");
        first.invalid("S1", "20240625", "A社", PL);
        first.invalid("S1", "20240625", "A社", CF);
        log.apply(first);

        let mut second = Journal::new();
        second.recovered("S1");
        second.validated("S1", PL);
        log.apply(second);

        assert_eq!(log.failed.iter().map(|f| f.doc_id.as_str()).collect::<Vec<_>>(), vec!["S2"]);
        assert_eq!(log.invalid.len(), 1);
        assert_eq!(log.invalid[0].report_type, CF);
    }

    #[test]
    fn test_merge_keeps_everything() {
        let mut a = Journal::new();
        a.fail("S1", "d", "x");
        let mut b = Journal::new();
        b.fail("S2", "d", "y");
        b.invalid("S2", "d", "B社", ArtifactKind::Fundamentals);
        a.merge(b);
        assert_eq!(a.failures().len(), 2);
        assert_eq!(a.invalid_summaries().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_round_trips_through_store() {
        let store = Arc::new(MemoryStore::new());
        let registry = FailureRegistry::new(store.clone());

        let mut journal = Journal::new();
        journal.fail("S1", "20240625", "download failed");
        journal.invalid("S2", "20240625", "B社", ArtifactKind::Fundamentals);
        registry.commit(journal).await.unwrap();

        let raw = store.get(INVALID_SUMMARY_KEY).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value[0]["report_type"], "Fundamentals");
        assert_eq!(value[0]["company_name"], "B社");

        let failures = registry.snapshot().await.unwrap();
        assert_eq!(failures.failed[0].error_msg, "download failed");
        assert_eq!(failures.invalid.len(), 1);
    }
}
