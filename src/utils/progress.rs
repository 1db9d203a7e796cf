use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

const RUNNING_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg:>40}";
const FINISHED_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg:>40}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Progress bar for a batch of filings. Without a `MultiProgress` every call
/// is a no-op, which is what tests and non-interactive runs use.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
    label: String,
}

impl ProgressTracker {
    pub fn new(multi_progress: Option<&Arc<MultiProgress>>, label: &str) -> Self {
        let progress_bar = multi_progress.map(|mp| {
            let pb = mp.add(ProgressBar::new(0));
            pb.set_style(style(RUNNING_TEMPLATE));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self {
            progress_bar,
            label: label.to_string(),
        }
    }

    pub fn start(&self, total: u64) {
        if let Some(pb) = &self.progress_bar {
            pb.reset();
            pb.set_length(total);
            pb.set_position(0);
            pb.set_message(self.label.clone());
        }
    }

    /// Records one finished filing.
    pub fn advance(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("{} - {}", self.label, message));
            pb.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.set_style(style(FINISHED_TEMPLATE));
            pb.set_message(format!("Complete [{}]", self.label));
            pb.finish();
        }
    }
}
