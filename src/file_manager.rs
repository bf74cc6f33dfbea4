//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file usate dal transcoder.
//!
//! ## Responsabilità:
//! - Lettura dimensione file
//! - Creazione idempotente delle directory di destinazione
//! - File temporaneo "fratello" del target (stessa directory, suffisso `.tmp`)
//! - Pubblicazione atomica: temp file → rename sul path finale
//! - Formattazione human-readable delle dimensioni
//!
//! ## Sicurezza operazioni:
//! - Il target non viene mai scritto direttamente: si scrive sempre nel temp file
//! - Se qualcosa fallisce prima del rename, il temp file viene rimosso al drop
//!   e il target resta nello stato precedente
//! - Il rename è l'ultimo passo, quindi il target è completo o assente
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut temp = FileManager::create_temp_sibling(&target)?;
//! temp.write_all(&bytes)?;
//! FileManager::publish(temp, &target)?;
//! ```

use std::fs;
use std::io;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

/// Suffix carried by every in-flight temporary file
pub const TEMP_SUFFIX: &str = ".tmp";

/// Manages file operations for the transcoder
pub struct FileManager;

impl FileManager {
    /// Size of a file in bytes
    pub fn file_size(path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    /// Create the parent directory tree of `path` (no error if it exists)
    pub fn ensure_parent_dirs(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Create a temporary file next to `target`.
    ///
    /// The name is `.<target file name>.<random>.tmp` so it can never collide
    /// with a real output and is easy to spot if a crash leaks it. The file
    /// is deleted when the handle is dropped without being published.
    pub fn create_temp_sibling(target: &Path) -> io::Result<NamedTempFile> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)
    }

    /// Give a temporary file the permission bits of `source`.
    ///
    /// Temp files are created owner-only; outputs must be as readable as
    /// the image they were made from.
    pub fn copy_permissions(source: &Path, temp: &NamedTempFile) -> io::Result<()> {
        let permissions = fs::metadata(source)?.permissions();
        fs::set_permissions(temp.path(), permissions)
    }

    /// Move a finished temporary file onto `target`.
    ///
    /// Any file already at `target` (overwrite mode, or created since the
    /// collision check) is removed first, then the temp file is renamed into
    /// place.
    pub fn publish(temp: NamedTempFile, target: &Path) -> io::Result<()> {
        if target.exists() {
            fs::remove_file(target)?;
        }
        temp.persist(target).map_err(|e| e.error)?;
        Ok(())
    }

    /// File name of a path, for messages
    pub fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const KB: f64 = 1024.0;
        const MB: f64 = KB * 1024.0;
        const GB: f64 = MB * 1024.0;

        let bytes = size as f64;
        if bytes < KB {
            format!("{} B", size)
        } else if bytes < MB {
            format!("{:.1} KB", bytes / KB)
        } else if bytes < GB {
            format!("{:.1} MB", bytes / MB)
        } else {
            format!("{:.2} GB", bytes / GB)
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
