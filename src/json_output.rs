//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'integrazione con altri processi.
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout (i log restano su stderr)
//! - Implementa `Reporter`, quindi riceve gli stessi eventi della progress bar
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio della run (directory, modo, numero di file)
//! - `file_complete`: Esito di un singolo file
//! - `complete`: Fine della run con il `RunSummary`
//! - `error`: Errore fatale prima o durante la run

use crate::config::{Config, Encoding};
use crate::outcome::{FileOutcome, OutcomeStatus};
use crate::progress::{Reporter, RunSummary};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio della run
    Start {
        input_dir: PathBuf,
        output_dir: Option<PathBuf>,
        total_files: usize,
        dry_run: bool,
        config: JsonConfig,
    },

    /// Esito di un file
    FileComplete {
        index: usize,
        total: usize,
        path: PathBuf,
        status: OutcomeStatus,
        original_size: u64,
        new_size: u64,
        message: String,
    },

    /// Run completata
    Complete {
        files_processed: usize,
        success: usize,
        skipped: usize,
        size_regression: usize,
        failed: usize,
        total_original: u64,
        total_new: u64,
        bytes_saved: u64,
        reduction_percent: f64,
        duration_seconds: f64,
    },

    /// Errore fatale
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Encoding settings echoed in the `start` message
#[derive(Debug, Clone, Serialize)]
pub struct JsonConfig {
    pub convert_to_webp: bool,
    /// `None` for lossless
    pub quality: Option<u8>,
    pub lossless: bool,
    pub preserve_exif: bool,
    pub overwrite: bool,
    pub workers: usize,
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        let quality = match config.encoding() {
            Encoding::Lossy(q) => Some(q),
            Encoding::Lossless => None,
        };
        Self {
            convert_to_webp: config.convert_to_webp,
            quality,
            lossless: config.lossless,
            preserve_exif: config.preserve_exif,
            overwrite: config.overwrite,
            workers: config.workers,
        }
    }
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn file_complete(index: usize, total: usize, outcome: &FileOutcome) -> Self {
        Self::FileComplete {
            index,
            total,
            path: outcome.source().to_path_buf(),
            status: outcome.status(),
            original_size: outcome.original_size(),
            new_size: outcome.new_size(),
            message: outcome.message().to_string(),
        }
    }

    pub fn complete(summary: &RunSummary, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: summary.total(),
            success: summary.success,
            skipped: summary.skipped,
            size_regression: summary.size_regression,
            failed: summary.failed,
            total_original: summary.total_original,
            total_new: summary.total_new,
            bytes_saved: summary.bytes_saved(),
            reduction_percent: summary.overall_reduction_percent(),
            duration_seconds,
        }
    }

    pub fn error(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Error {
            message: message.into(),
            details,
        }
    }
}

/// Reporter that prints one JSON line per event
pub struct JsonReporter {
    input_dir: PathBuf,
    output_dir: Option<PathBuf>,
    config: JsonConfig,
    started: Instant,
}

impl JsonReporter {
    pub fn new(input_dir: PathBuf, config: &Config) -> Self {
        Self {
            input_dir,
            output_dir: config.output_path.clone(),
            config: JsonConfig::from(config),
            started: Instant::now(),
        }
    }
}

impl Reporter for JsonReporter {
    fn on_start(&self, total: usize, dry_run: bool) {
        JsonMessage::Start {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            total_files: total,
            dry_run,
            config: self.config.clone(),
        }
        .emit();
    }

    fn on_outcome(&self, index: usize, total: usize, outcome: &FileOutcome) {
        JsonMessage::file_complete(index, total, outcome).emit();
    }

    fn on_finish(&self, summary: &RunSummary) {
        JsonMessage::complete(summary, self.started.elapsed().as_secs_f64()).emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::path::Path;

    #[test]
    fn test_file_complete_shape() {
        let outcome = FileOutcome::success(Path::new("/p/a.jpg"), Path::new("/p/a_70%.jpg"), 1000, 250);
        let json = serde_json::to_value(JsonMessage::file_complete(2, 5, &outcome)).unwrap();

        assert_eq!(json["type"], "file_complete");
        assert_eq!(json["index"], 2);
        assert_eq!(json["total"], 5);
        assert_eq!(json["status"], "success");
        assert_eq!(json["original_size"], 1000);
        assert_eq!(json["new_size"], 250);
        assert!(json["message"].as_str().unwrap().starts_with("[OK]"));
    }

    #[test]
    fn test_complete_carries_summary() {
        let summary = RunSummary {
            success: 3,
            skipped: 1,
            size_regression: 1,
            failed: 0,
            total_original: 4000,
            total_new: 1000,
        };
        let json = serde_json::to_value(JsonMessage::complete(&summary, 1.5)).unwrap();

        assert_eq!(json["type"], "complete");
        assert_eq!(json["success"], 3);
        assert_eq!(json["size_regression"], 1);
        assert_eq!(json["files_processed"], 5);
        assert_eq!(json["bytes_saved"], 3000);
        assert_eq!(json["reduction_percent"], 75.0);
    }

    #[test]
    fn test_start_config_for_lossless_webp() {
        let config = Config {
            convert_to_webp: true,
            lossless: true,
            ..Default::default()
        };
        let message = JsonMessage::Start {
            input_dir: PathBuf::from("/in"),
            output_dir: None,
            total_files: 7,
            dry_run: true,
            config: JsonConfig::from(&config),
        };
        let json: Value = serde_json::to_value(message).unwrap();

        assert_eq!(json["type"], "start");
        assert_eq!(json["total_files"], 7);
        assert_eq!(json["config"]["lossless"], true);
        assert!(json["config"]["quality"].is_null());
        assert!(json["output_dir"].is_null());
    }
}
