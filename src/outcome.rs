//! # Work Items and Outcomes
//!
//! Valori immutabili scambiati tra discovery, worker e aggregatore.
//!
//! - `WorkItem`: path sorgente + path target già risolto (identico in dry-run e run reale)
//! - `FileOutcome`: risultato di un singolo `WorkItem`, prodotto esattamente una volta
//!   dal worker e consumato una sola volta dall'aggregatore

use crate::file_manager::FileManager;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A source file paired with the path it would be written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    source: PathBuf,
    target: PathBuf,
}

impl WorkItem {
    pub fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// Result classification of one work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Skipped,
    SizeRegression,
    Failed,
    Preview,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::SizeRegression => "size_regression",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Preview => "preview",
        };
        f.write_str(label)
    }
}

/// Immutable record of what happened to one work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    status: OutcomeStatus,
    message: String,
    source: PathBuf,
    original_size: u64,
    new_size: u64,
}

impl FileOutcome {
    pub fn success(source: &Path, target: &Path, original_size: u64, new_size: u64) -> Self {
        let reduction = FileManager::calculate_reduction(original_size, new_size);
        Self {
            status: OutcomeStatus::Success,
            message: format!(
                "[OK] {} -> {} ({} -> {}, -{:.1}%)",
                FileManager::display_name(source),
                FileManager::display_name(target),
                FileManager::format_size(original_size),
                FileManager::format_size(new_size),
                reduction
            ),
            source: source.to_path_buf(),
            original_size,
            new_size,
        }
    }

    pub fn skipped(source: &Path, reason: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Skipped,
            message: format!("[SKIP] {}: {}", FileManager::display_name(source), reason.into()),
            source: source.to_path_buf(),
            original_size: 0,
            new_size: 0,
        }
    }

    pub fn size_regression(source: &Path, original_size: u64, new_size: u64) -> Self {
        Self {
            status: OutcomeStatus::SizeRegression,
            message: format!(
                "[SIZE] {}: result not smaller ({} -> {}), kept original",
                FileManager::display_name(source),
                FileManager::format_size(original_size),
                FileManager::format_size(new_size)
            ),
            source: source.to_path_buf(),
            original_size,
            new_size,
        }
    }

    pub fn failed(source: &Path, error: impl fmt::Display) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            message: format!("[ERROR] {}: {}", FileManager::display_name(source), error),
            source: source.to_path_buf(),
            original_size: 0,
            new_size: 0,
        }
    }

    pub fn preview(source: &Path, target: &Path, original_size: u64) -> Self {
        Self {
            status: OutcomeStatus::Preview,
            message: format!(
                "[PREVIEW] {} -> {} ({})",
                FileManager::display_name(source),
                target.display(),
                FileManager::format_size(original_size)
            ),
            source: source.to_path_buf(),
            original_size,
            new_size: 0,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    pub fn new_size(&self) -> u64 {
        self.new_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_constructors() {
        let src = Path::new("/photos/a.jpg");
        let ok = FileOutcome::success(src, Path::new("/photos/a_70%.jpg"), 200, 50);
        assert_eq!(ok.status(), OutcomeStatus::Success);
        assert_eq!(ok.original_size(), 200);
        assert_eq!(ok.new_size(), 50);
        assert!(ok.message().contains("a_70%.jpg"));

        let failed = FileOutcome::failed(src, "decode error");
        assert_eq!(failed.status(), OutcomeStatus::Failed);
        assert_eq!(failed.new_size(), 0);
        assert!(failed.message().contains("a.jpg"));
        assert!(failed.message().contains("decode error"));

        let preview = FileOutcome::preview(src, Path::new("/out/a.webp"), 1024);
        assert_eq!(preview.status(), OutcomeStatus::Preview);
        assert_eq!(preview.original_size(), 1024);
        assert!(preview.message().contains("/out/a.webp"));
    }

    #[test]
    fn test_status_serializes_as_snake_case() {
        let json = serde_json::to_string(&OutcomeStatus::SizeRegression).unwrap();
        assert_eq!(json, "\"size_regression\"");
        assert_eq!(OutcomeStatus::SizeRegression.to_string(), "size_regression");
    }
}
