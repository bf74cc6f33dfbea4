//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di transcodifica.
//!
//! ## Responsabilità:
//! - `RunSummary`: fold puro degli esiti per-file (conteggi per stato, byte totali)
//! - `Reporter`: interfaccia verso il rendering (progress bar, JSON, test)
//! - `ProgressReporter`: progress bar con `indicatif` + log finale via `tracing`
//!
//! ## Aggregazione:
//! - Il `RunSummary` appartiene al solo punto di aggregazione della pipeline
//! - I worker non lo toccano mai: producono `FileOutcome` immutabili
//! - `preview` viene contato insieme a `skipped`
//! - I byte originali/nuovi vengono sommati solo per gli esiti `success`
//! - L'ordine di arrivo degli esiti non cambia il risultato finale
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [========================================] 150/150 (100%) [OK] photo.jpg -> photo_70%.jpg
//! ```

use crate::file_manager::FileManager;
use crate::outcome::{FileOutcome, OutcomeStatus};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Counts and byte totals for a whole run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub success: usize,
    pub skipped: usize,
    pub size_regression: usize,
    pub failed: usize,
    /// Sum of source sizes for successful items
    pub total_original: u64,
    /// Sum of produced sizes for successful items
    pub total_new: u64,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome into the summary
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome.status() {
            OutcomeStatus::Success => {
                self.success += 1;
                self.total_original += outcome.original_size();
                self.total_new += outcome.new_size();
            }
            OutcomeStatus::Skipped | OutcomeStatus::Preview => self.skipped += 1,
            OutcomeStatus::SizeRegression => self.size_regression += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }

    /// Number of outcomes folded so far
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.size_regression + self.failed
    }

    pub fn bytes_saved(&self) -> u64 {
        self.total_original.saturating_sub(self.total_new)
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.total_original, self.total_new)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Success: {} | Skipped: {} | Size regression: {} | Failed: {} | Total saved: {} ({:.1}%)",
            self.total(),
            self.success,
            self.skipped,
            self.size_regression,
            self.failed,
            FileManager::format_size(self.bytes_saved()),
            self.overall_reduction_percent()
        )
    }
}

impl<'a> FromIterator<&'a FileOutcome> for RunSummary {
    fn from_iter<I: IntoIterator<Item = &'a FileOutcome>>(iter: I) -> Self {
        let mut summary = RunSummary::new();
        for outcome in iter {
            summary.record(outcome);
        }
        summary
    }
}

/// Rendering sink for pipeline events.
///
/// Called only from the pipeline's aggregation point, one event at a time.
pub trait Reporter: Send + Sync {
    /// A run is about to start with `total` items
    fn on_start(&self, _total: usize, _dry_run: bool) {}

    /// Outcome number `index` (1-based, completion order) of `total`
    fn on_outcome(&self, index: usize, total: usize, outcome: &FileOutcome);

    /// The run is over
    fn on_finish(&self, summary: &RunSummary);
}

/// Reporter that discards everything
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn on_outcome(&self, _index: usize, _total: usize, _outcome: &FileOutcome) {}

    fn on_finish(&self, _summary: &RunSummary) {}
}

/// Manages progress reporting for a transcoding run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Set the number of expected items
    pub fn set_length(&self, total_files: u64) {
        self.bar.set_length(total_files);
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Print a line above the bar
    pub fn println(&self, message: &str) {
        self.bar.println(message);
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Terminal reporter: progress bar plus tracing output
pub struct ProgressReporter {
    progress: ProgressManager,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            progress: ProgressManager::new(0),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ProgressReporter {
    fn on_start(&self, total: usize, dry_run: bool) {
        self.progress.set_length(total as u64);
        if total == 0 {
            return;
        }
        if dry_run {
            info!("[DRY-RUN] Found {} images, preview only (nothing will be written)", total);
        } else {
            info!("Found {} images, starting...", total);
        }
    }

    fn on_outcome(&self, index: usize, total: usize, outcome: &FileOutcome) {
        let line = format!("[{}/{}] {}", index, total, outcome.message());
        match outcome.status() {
            OutcomeStatus::Failed => error!("{}", line),
            OutcomeStatus::Skipped => debug!("{}", line),
            OutcomeStatus::SizeRegression => warn!("{}", line),
            OutcomeStatus::Success | OutcomeStatus::Preview => self.progress.println(&line),
        }
        self.progress.update(outcome.message());
    }

    fn on_finish(&self, summary: &RunSummary) {
        self.progress.finish(&summary.format_summary());
        log_summary(summary);
    }
}

/// Print the final statistics through tracing
pub fn log_summary(summary: &RunSummary) {
    info!("=== Transcoding Complete ===");
    info!("Success: {}", summary.success);
    info!("Skipped (existing/already processed/preview): {}", summary.skipped);
    info!("Skipped (result not smaller): {}", summary.size_regression);
    info!("Failed: {}", summary.failed);
    info!("Original total size: {}", FileManager::format_size(summary.total_original));
    info!("New total size: {}", FileManager::format_size(summary.total_new));
    info!(
        "Total saved: {} ({:.1}%)",
        FileManager::format_size(summary.bytes_saved()),
        summary.overall_reduction_percent()
    );
}
