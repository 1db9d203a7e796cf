use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use compass::{
    core::RegisterConfig,
    edinet::FilingDescriptor,
    failures::FailureRegistry,
    fetch::{decode_body, extract_xbrl, list_range, CachedSource, EdinetClient, FilingSource, RawFiling},
    register::{register_filing, run_batch, BatchReport, Execution, FilingOutcome, RunContext},
    storage::{MemoryStore, ObjectStore, SledStore},
};
use indicatif::MultiProgress;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "compass-cli", about = "Register EDINET annual report statements")]
enum Command {
    /// Fetch and register every annual report submitted in a date range
    Run {
        /// First submission date (YYYY-MM-DD)
        #[structopt(long, parse(try_from_str = parse_date))]
        from: NaiveDate,
        /// Last submission date, inclusive (YYYY-MM-DD)
        #[structopt(long, parse(try_from_str = parse_date))]
        to: NaiveDate,
        /// Process one filing at a time
        #[structopt(long)]
        sequential: bool,
        /// Keep published artifacts in memory instead of the local store
        #[structopt(long)]
        dry_run: bool,
    },
    /// Register a single XBRL instance (or EDINET zip) from disk
    File {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
        #[structopt(long)]
        edinet_code: String,
        #[structopt(long)]
        doc_id: String,
        #[structopt(long)]
        company: String,
        #[structopt(long)]
        period_start: String,
        #[structopt(long)]
        period_end: String,
        #[structopt(long, default_value = "00000000")]
        date_key: String,
        #[structopt(long)]
        dry_run: bool,
    },
    /// Print the failed and invalid summary lists
    Failures,
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| anyhow!("Invalid date {:?}: {}", value, e))
}

/// Reads a filing straight from disk.
struct LocalFileSource {
    path: PathBuf,
}

#[async_trait]
impl FilingSource for LocalFileSource {
    async fn fetch(&self, descriptor: &FilingDescriptor) -> Result<RawFiling> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        let is_zip = self
            .path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        let (file_name, xbrl) = if is_zip {
            extract_xbrl(&bytes)?
        } else {
            let name = self
                .path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| format!("{}.xbrl", descriptor.doc_id));
            (name, bytes)
        };
        Ok(RawFiling {
            doc_id: descriptor.doc_id.clone(),
            date_key: descriptor.date_key.clone(),
            file_name,
            body: decode_body(&xbrl),
        })
    }
}

struct Stores {
    reports: Arc<dyn ObjectStore>,
    raw: Arc<dyn ObjectStore>,
    db: Option<sled::Db>,
}

impl Stores {
    async fn close(self) -> Result<()> {
        if let Some(db) = self.db {
            db.flush_async().await.context("Failed to flush store")?;
        }
        Ok(())
    }
}

fn open_stores(config: &RegisterConfig, dry_run: bool) -> Result<Stores> {
    if dry_run {
        return Ok(Stores {
            reports: Arc::new(MemoryStore::new()),
            raw: Arc::new(MemoryStore::new()),
            db: None,
        });
    }
    std::fs::create_dir_all(&config.data_dir)?;
    let db = sled::open(config.store_path())
        .with_context(|| format!("Failed to open store at {:?}", config.store_path()))?;
    Ok(Stores {
        reports: Arc::new(SledStore::with_db(&db, "reports")?),
        raw: Arc::new(SledStore::with_db(&db, "raw")?),
        db: Some(db),
    })
}

fn print_outcome(outcome: &FilingOutcome) {
    println!("== {} ==", outcome.doc_id);
    if let Some(code) = &outcome.security_code {
        println!("security code: {}", code);
    }
    for validation in &outcome.validations {
        let status = if validation.valid { "valid" } else { "incomplete" };
        println!("{:<12} {}", validation.kind.to_string(), status);
    }
    for key in outcome.written() {
        println!("written  {}", key);
    }
    for key in outcome.skipped() {
        println!("skipped  {}", key);
    }
    for key in outcome.retired() {
        println!("retired  {}", key);
    }
    for failure in outcome.journal.failures() {
        println!("failed   {}", failure.error_msg);
    }
}

fn print_batch(report: &BatchReport) {
    println!(
        "{} filings, {} written, {} skipped, {} retired, {} API calls",
        report.outcomes.len(),
        report.written(),
        report.skipped(),
        report.retired(),
        report.api_calls
    );
    println!(
        "{} failed reports, {} invalid summaries on record",
        report.failures.failed.len(),
        report.failures.invalid.len()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let command = Command::from_args();
    let config = RegisterConfig::from_env()?;

    match command {
        Command::Run {
            from,
            to,
            sequential,
            dry_run,
        } => {
            if from > to {
                return Err(anyhow!("--from {} is after --to {}", from, to));
            }
            let stores = open_stores(&config, dry_run)?;
            let counter = compass::fetch::CallCounter::default();
            let client = Arc::new(EdinetClient::new(&config, counter.clone())?);
            let source = CachedSource::new(client.clone(), stores.raw.clone(), config.xbrl_from_cache);

            let ctx = RunContext::new(stores.reports.clone(), Arc::new(source))
                .with_call_counter(counter)
                .with_progress(Arc::new(MultiProgress::new()));

            let descriptors = list_range(client.as_ref(), from, to).await?;
            log::info!("{} annual reports between {} and {}", descriptors.len(), from, to);

            let execution = if sequential {
                Execution::Sequential
            } else {
                Execution::from_limit(config.concurrency())
            };
            let report = run_batch(&ctx, &descriptors, execution).await?;
            print_batch(&report);
            stores.close().await?;
        }
        Command::File {
            path,
            edinet_code,
            doc_id,
            company,
            period_start,
            period_end,
            date_key,
            dry_run,
        } => {
            if !path.exists() {
                return Err(anyhow!("Input file does not exist: {:?}", path));
            }
            let stores = open_stores(&config, dry_run)?;
            let ctx = RunContext::new(stores.reports.clone(), Arc::new(LocalFileSource { path }));
            let descriptor = FilingDescriptor {
                date_key,
                doc_id,
                edinet_code,
                filer_name: company,
                period_start,
                period_end,
                ..Default::default()
            };

            let mut outcome = register_filing(&ctx, &descriptor).await;
            print_outcome(&outcome);
            ctx.failures
                .commit(std::mem::take(&mut outcome.journal))
                .await?;
            stores.close().await?;
        }
        Command::Failures => {
            let stores = open_stores(&config, false)?;
            let failures = FailureRegistry::new(stores.reports.clone())
                .snapshot()
                .await?;
            println!("failed.json:");
            println!("{}", serde_json::to_string_pretty(&failures.failed)?);
            println!("invalid-summary.json:");
            println!("{}", serde_json::to_string_pretty(&failures.invalid)?);
        }
    }

    Ok(())
}
