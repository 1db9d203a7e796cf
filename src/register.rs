use crate::edinet::parsing::{format_fragment, security_code, FragmentSelector, PatternSelector};
use crate::edinet::publish::{render_html, render_json};
use crate::edinet::validate::fundamental_is_valid;
use crate::edinet::{
    extract, should_publish, ArtifactFormat, ArtifactKey, ArtifactKind, BsSummary, CfSummary,
    FilingDescriptor, Fundamental, PlSummary, PublishDecision, Statement, StatementMeta,
    ValidationOutcome,
};
use crate::failures::{FailureLog, FailureRegistry, Journal};
use crate::fetch::{CallCounter, FilingSource};
use crate::storage::ObjectStore;
use crate::utils::progress::ProgressTracker;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::MultiProgress;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Everything a registration run shares between filing tasks.
pub struct RunContext {
    pub reports: Arc<dyn ObjectStore>,
    pub source: Arc<dyn FilingSource>,
    pub selector: Arc<dyn FragmentSelector>,
    pub failures: FailureRegistry,
    pub api_calls: CallCounter,
    pub progress: Option<Arc<MultiProgress>>,
}

impl RunContext {
    pub fn new(reports: Arc<dyn ObjectStore>, source: Arc<dyn FilingSource>) -> Self {
        Self {
            failures: FailureRegistry::new(reports.clone()),
            reports,
            source,
            selector: Arc::new(PatternSelector),
            api_calls: CallCounter::default(),
            progress: None,
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn FragmentSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_call_counter(mut self, counter: CallCounter) -> Self {
        self.api_calls = counter;
        self
    }

    pub fn with_progress(mut self, progress: Arc<MultiProgress>) -> Self {
        self.progress = Some(progress);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Sequential,
    Concurrent(usize),
}

impl Execution {
    pub fn from_limit(limit: usize) -> Self {
        if limit <= 1 {
            Execution::Sequential
        } else {
            Execution::Concurrent(limit)
        }
    }

    pub fn limit(&self) -> usize {
        match self {
            Execution::Sequential => 1,
            Execution::Concurrent(limit) => (*limit).max(1),
        }
    }
}

/// What happened to one published artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Written { key: String, retired: Vec<String> },
    Skipped(String),
}

#[derive(Debug, Default)]
pub struct FilingOutcome {
    pub doc_id: String,
    pub security_code: Option<String>,
    pub validations: Vec<ValidationOutcome>,
    pub published: Vec<Published>,
    pub journal: Journal,
}

impl FilingOutcome {
    pub fn written(&self) -> impl Iterator<Item = &str> {
        self.published.iter().filter_map(|p| match p {
            Published::Written { key, .. } => Some(key.as_str()),
            Published::Skipped(_) => None,
        })
    }

    pub fn retired(&self) -> impl Iterator<Item = &str> {
        self.published.iter().flat_map(|p| match p {
            Published::Written { retired, .. } => retired.iter().map(String::as_str).collect::<Vec<_>>(),
            Published::Skipped(_) => Vec::new(),
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.published.iter().filter_map(|p| match p {
            Published::Skipped(key) => Some(key.as_str()),
            Published::Written { .. } => None,
        })
    }
}

struct Artifact {
    key: ArtifactKey,
    body: Vec<u8>,
}

/// Applies the idempotency rules and writes one artifact.
async fn publish_artifact(store: &dyn ObjectStore, artifact: Artifact) -> Result<Published> {
    let key = artifact.key.to_string();
    let existing = store.list(&artifact.key.prefix()).await?;
    let retired = match should_publish(&artifact.key, &existing) {
        PublishDecision::Skip => {
            log::info!("{} is already registered", key);
            return Ok(Published::Skipped(key));
        }
        PublishDecision::Publish => Vec::new(),
        PublishDecision::PublishAndRetire(stale) => {
            for old in &stale {
                store
                    .delete(old)
                    .await
                    .with_context(|| format!("Failed to delete stale artifact {}", old))?;
                log::info!("Deleted stale artifact {}", old);
            }
            stale
        }
    };

    store
        .put(&key, artifact.body, &artifact.key.format.content_type())
        .await
        .with_context(|| format!("Failed to write {}", key))?;
    log::info!("Registered {}", key);
    Ok(Published::Written { key, retired })
}

/// One statement pass: select, classify, validate, and queue what should be
/// published.
fn statement_pass<S: Statement>(
    ctx: &RunContext,
    descriptor: &FilingDescriptor,
    body: &str,
    fundamental: &mut Fundamental,
    outcome: &mut FilingOutcome,
) -> Result<Vec<Artifact>> {
    let kind = S::KIND;
    let Some(fragment) = ctx.selector.select(body, kind) else {
        log::info!("{} has no {} data", descriptor.filer_name, kind);
        return Ok(Vec::new());
    };

    let key = |format| {
        ArtifactKey::statement(
            &descriptor.edinet_code,
            &descriptor.doc_id,
            kind.into(),
            &descriptor.period_start,
            &descriptor.period_end,
            format,
        )
    };

    let mut artifacts = vec![Artifact {
        key: key(ArtifactFormat::Html),
        body: render_html(
            &format!("{} {}", descriptor.filer_name, kind),
            &format_fragment(&fragment.html),
        ),
    }];

    let meta = StatementMeta::new(
        &descriptor.filer_name,
        &descriptor.period_start,
        &descriptor.period_end,
    );
    let summary = match extract::<S>(&fragment, meta, fundamental) {
        Ok(summary) => summary,
        Err(err) => {
            outcome
                .journal
                .fail(&descriptor.doc_id, &descriptor.date_key, err.to_string());
            return Ok(artifacts);
        }
    };

    let valid = summary.is_valid();
    let validation = ValidationOutcome::new(kind.into(), valid, &summary);
    validation.log(&descriptor.filer_name);
    outcome.validations.push(validation);

    if valid {
        outcome.journal.validated(&descriptor.doc_id, kind.into());
        artifacts.push(Artifact {
            key: key(ArtifactFormat::Json),
            body: render_json(&summary)?,
        });
    } else {
        outcome.journal.invalid(
            &descriptor.doc_id,
            &descriptor.date_key,
            &descriptor.filer_name,
            kind.into(),
        );
    }
    Ok(artifacts)
}

fn fundamentals_artifact(
    descriptor: &FilingDescriptor,
    fundamental: &Fundamental,
    outcome: &mut FilingOutcome,
) -> Result<Option<Artifact>> {
    let valid = fundamental_is_valid(fundamental);
    let validation = ValidationOutcome::new(ArtifactKind::Fundamentals, valid, fundamental);
    validation.log(&descriptor.filer_name);
    outcome.validations.push(validation);

    if !valid {
        outcome.journal.invalid(
            &descriptor.doc_id,
            &descriptor.date_key,
            &descriptor.filer_name,
            ArtifactKind::Fundamentals,
        );
        return Ok(None);
    }
    outcome
        .journal
        .validated(&descriptor.doc_id, ArtifactKind::Fundamentals);
    Ok(Some(Artifact {
        key: ArtifactKey::fundamentals(
            &descriptor.edinet_code,
            &descriptor.period_start,
            &descriptor.period_end,
        ),
        body: render_json(fundamental)?,
    }))
}

async fn process_filing(
    ctx: &RunContext,
    descriptor: &FilingDescriptor,
    outcome: &mut FilingOutcome,
) -> Result<()> {
    let filing = ctx
        .source
        .fetch(descriptor)
        .await
        .with_context(|| format!("Failed to fetch filing {}", descriptor.doc_id))?;
    outcome.security_code = security_code(&filing.body);

    let mut fundamental = Fundamental::new(
        &descriptor.filer_name,
        &descriptor.period_start,
        &descriptor.period_end,
    );
    let mut artifacts = Vec::new();
    artifacts.extend(statement_pass::<BsSummary>(
        ctx,
        descriptor,
        &filing.body,
        &mut fundamental,
        outcome,
    )?);
    artifacts.extend(statement_pass::<PlSummary>(
        ctx,
        descriptor,
        &filing.body,
        &mut fundamental,
        outcome,
    )?);
    artifacts.extend(statement_pass::<CfSummary>(
        ctx,
        descriptor,
        &filing.body,
        &mut fundamental,
        outcome,
    )?);
    artifacts.extend(fundamentals_artifact(descriptor, &fundamental, outcome)?);

    let store = ctx.reports.as_ref();
    let results =
        futures::future::join_all(artifacts.into_iter().map(|a| publish_artifact(store, a))).await;
    for result in results {
        match result {
            Ok(published) => outcome.published.push(published),
            Err(err) => {
                outcome
                    .journal
                    .fail(&descriptor.doc_id, &descriptor.date_key, format!("{:#}", err))
            }
        }
    }
    Ok(())
}

/// Registers a single filing. Errors never escape: they are recorded in the
/// outcome's journal so the rest of a batch keeps going.
pub async fn register_filing(ctx: &RunContext, descriptor: &FilingDescriptor) -> FilingOutcome {
    log::info!(
        "Registering {} ({}, {})",
        descriptor.filer_name,
        descriptor.doc_id,
        descriptor.date_key
    );
    let mut outcome = FilingOutcome {
        doc_id: descriptor.doc_id.clone(),
        ..Default::default()
    };

    if let Err(err) = process_filing(ctx, descriptor, &mut outcome).await {
        outcome
            .journal
            .fail(&descriptor.doc_id, &descriptor.date_key, format!("{:#}", err));
    }
    if !outcome.journal.has_failures() {
        outcome.journal.recovered(&descriptor.doc_id);
    }
    outcome
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FilingOutcome>,
    pub failures: FailureLog,
    pub api_calls: usize,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.outcomes.iter().map(|o| o.written().count()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().map(|o| o.skipped().count()).sum()
    }

    pub fn retired(&self) -> usize {
        self.outcomes.iter().map(|o| o.retired().count()).sum()
    }
}

/// Runs the filing task over every descriptor, then merges all journals into
/// the failure log in one locked update.
pub async fn run_batch(
    ctx: &RunContext,
    descriptors: &[FilingDescriptor],
    execution: Execution,
) -> Result<BatchReport> {
    let tracker = ProgressTracker::new(ctx.progress.as_ref(), "Registering filings");
    tracker.start(descriptors.len() as u64);
    let tracker = &tracker;

    let mut outcomes: Vec<FilingOutcome> = stream::iter(descriptors)
        .map(|descriptor| async move {
            let outcome = register_filing(ctx, descriptor).await;
            tracker.advance(&descriptor.filer_name);
            outcome
        })
        .buffer_unordered(execution.limit())
        .collect()
        .await;
    tracker.finish();

    let mut journal = Journal::new();
    for outcome in outcomes.iter_mut() {
        journal.merge(std::mem::take(&mut outcome.journal));
    }
    let failures = ctx.failures.commit(journal).await?;

    Ok(BatchReport {
        outcomes,
        failures,
        api_calls: ctx.api_calls.load(Ordering::SeqCst),
    })
}
