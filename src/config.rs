//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di transcodifica
//! - Fornisce validazione robusta dei parametri di input (una sola volta, all'avvio)
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Produce la `TransformConfig` immutabile condivisa da tutti i worker
//!
//! ## Parametri di configurazione:
//! - `quality`: Qualità lossy (1-100, default: 70 per re-encode, 80 per WebP)
//! - `lossless`: Encoding WebP lossless (esclusivo con `quality`)
//! - `convert_to_webp`: Converte tutte le immagini in WebP (default: false)
//! - `preserve_exif`: Copia i metadata EXIF nel file prodotto
//! - `overwrite`: Sovrascrive target esistenti (default: false)
//! - `dry_run`: Flag per simulazione senza modifiche (default: false)
//! - `workers`: Numero di worker paralleli (default: 4)
//! - `output_path`: Directory di output (default: None = accanto al sorgente, con suffisso)
//! - `max_depth`, `min_size`, `max_size`, `exclude_dirs`: Filtri di discovery
//! - `supported_formats`, `excluded_formats`, `forced_conversion`: Policy dei formati
//!
//! ## Esempio:
//! ```rust
//! use image_transcoder::Config;
//!
//! let config = Config {
//!     quality: Some(85),
//!     workers: 8,
//!     ..Default::default()
//! };
//! config.validate().unwrap();
//! ```

use crate::error::TranscodeError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default quality for same-format re-encoding.
pub const DEFAULT_QUALITY: u8 = 70;
/// Default quality for WebP conversion.
pub const DEFAULT_WEBP_QUALITY: u8 = 80;

/// Configuration for image transcoding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lossy quality (1-100); `None` uses the mode default
    pub quality: Option<u8>,
    /// Lossless WebP encoding (only valid together with `convert_to_webp`)
    pub lossless: bool,
    /// Convert every image to WebP instead of re-encoding in its own format
    pub convert_to_webp: bool,
    /// Copy embedded EXIF metadata into the produced file
    pub preserve_exif: bool,
    /// Replace targets that already exist
    pub overwrite: bool,
    /// Dry run - report what would be written without touching the filesystem
    pub dry_run: bool,
    /// Number of parallel workers
    pub workers: usize,
    /// Output root for a mirrored tree (None = write beside the source, suffix-tagged)
    pub output_path: Option<PathBuf>,
    /// Maximum recursion depth (0 = only direct children, None = unbounded)
    pub max_depth: Option<usize>,
    /// Minimum source size in bytes (inclusive)
    pub min_size: Option<u64>,
    /// Maximum source size in bytes (inclusive)
    pub max_size: Option<u64>,
    /// Directory names never descended into
    pub exclude_dirs: Vec<String>,
    /// Candidate extensions; `None` uses the mode default
    pub supported_formats: Option<Vec<String>>,
    /// Extensions that are discovered but always skipped; `None` uses the mode default
    pub excluded_formats: Option<Vec<String>>,
    /// Extensions that are always converted, regardless of resulting size; `None` uses the mode default
    pub forced_conversion: Option<Vec<String>>,
    /// Output progress and results as JSON lines for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quality: None,
            lossless: false,
            convert_to_webp: false,
            preserve_exif: false,
            overwrite: false,
            dry_run: false,
            workers: 4,
            output_path: None,
            max_depth: None,
            min_size: None,
            max_size: None,
            exclude_dirs: Vec::new(),
            supported_formats: None,
            excluded_formats: None,
            forced_conversion: None,
            json_output: false,
        }
    }
}

/// How pixels are encoded into the target format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Lossy(u8),
    Lossless,
}

impl Encoding {
    /// Value used in the `_<quality>%` filename tag for in-place outputs.
    pub fn tag(&self) -> u8 {
        match self {
            Encoding::Lossy(quality) => *quality,
            Encoding::Lossless => 100,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), TranscodeError> {
        if let Some(quality) = self.quality {
            if quality == 0 || quality > 100 {
                return Err(TranscodeError::Config(format!(
                    "quality must be between 1 and 100 (got {})",
                    quality
                )));
            }
        }

        if self.lossless {
            if !self.convert_to_webp {
                return Err(TranscodeError::Config(
                    "lossless encoding is only supported together with WebP conversion".to_string(),
                ));
            }
            if self.quality.is_some() {
                return Err(TranscodeError::Config(
                    "quality and lossless are mutually exclusive".to_string(),
                ));
            }
        }

        if self.workers == 0 {
            return Err(TranscodeError::Config(
                "number of workers must be greater than 0".to_string(),
            ));
        }

        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(TranscodeError::Config(format!(
                    "minimum size ({} bytes) is larger than maximum size ({} bytes)",
                    min, max
                )));
            }
        }

        if self.supported_extensions().is_empty() {
            return Err(TranscodeError::Config(
                "supported format list is empty".to_string(),
            ));
        }

        if let Some(ref output_path) = self.output_path {
            if output_path.exists() && !output_path.is_dir() {
                return Err(TranscodeError::Config(format!(
                    "output path is not a directory: {}",
                    output_path.display()
                )));
            }
        }

        Ok(())
    }

    /// Effective encoding for this run
    pub fn encoding(&self) -> Encoding {
        if self.lossless {
            return Encoding::Lossless;
        }
        let default = if self.convert_to_webp {
            DEFAULT_WEBP_QUALITY
        } else {
            DEFAULT_QUALITY
        };
        Encoding::Lossy(self.quality.unwrap_or(default))
    }

    /// Extensions picked up by discovery
    pub fn supported_extensions(&self) -> HashSet<String> {
        let defaults: &[&str] = if self.convert_to_webp {
            &["jpg", "jpeg", "png", "bmp"]
        } else {
            &["jpg", "jpeg", "png", "webp", "bmp"]
        };
        extension_set(self.supported_formats.as_deref(), defaults)
    }

    /// Extensions that have no safe re-encode path in the current mode
    pub fn excluded_extensions(&self) -> HashSet<String> {
        let defaults: &[&str] = if self.convert_to_webp { &[] } else { &["bmp"] };
        extension_set(self.excluded_formats.as_deref(), defaults)
    }

    /// Extensions that are always converted to the mode's lossy format
    pub fn forced_conversion_extensions(&self) -> HashSet<String> {
        let defaults: &[&str] = if self.convert_to_webp { &[] } else { &["webp"] };
        extension_set(self.forced_conversion.as_deref(), defaults)
    }

    /// Immutable per-file settings shared by every worker
    pub fn transform_config(&self) -> TransformConfig {
        TransformConfig {
            encoding: self.encoding(),
            convert_to_webp: self.convert_to_webp,
            preserve_exif: self.preserve_exif,
            overwrite: self.overwrite,
            dry_run: self.dry_run,
            output_root: self.output_path.clone(),
            excluded_formats: self.excluded_extensions(),
            forced_conversion: self.forced_conversion_extensions(),
        }
    }

    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("image-transcoder").join("config.json"))
    }

    /// Load configuration from file.
    ///
    /// Not validated here: command-line flags may still complete it.
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Per-file transform settings, validated once and never mutated.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub encoding: Encoding,
    pub convert_to_webp: bool,
    pub preserve_exif: bool,
    pub overwrite: bool,
    pub dry_run: bool,
    /// Mirror root; `None` means in-place, suffix-tagged outputs
    pub output_root: Option<PathBuf>,
    pub excluded_formats: HashSet<String>,
    pub forced_conversion: HashSet<String>,
}

impl TransformConfig {
    pub fn is_excluded(&self, extension: &str) -> bool {
        self.excluded_formats.contains(extension)
    }

    pub fn is_forced_conversion(&self, extension: &str) -> bool {
        self.forced_conversion.contains(extension)
    }
}

/// Lowercase, dot-less extension of a path
pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

fn extension_set(configured: Option<&[String]>, defaults: &[&str]) -> HashSet<String> {
    match configured {
        Some(list) => list
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect(),
        None => defaults.iter().map(|ext| ext.to_string()).collect(),
    }
}
