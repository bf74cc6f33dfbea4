//! # Transcoder Module
//!
//! Trasformazione pura di un singolo file: dato un `WorkItem` e la
//! `TransformConfig`, produce un file codificato sul disco oppure un esito
//! strutturato (skip, preview, size regression, errore).
//!
//! ## Sequenza di decisione (l'ordine conta):
//! 1. **Esclusione formato**: formati senza un re-encode sicuro → `skipped`
//! 2. **Già processato**: solo in modalità in-place, nomi con suffisso `_<n>%` → `skipped`
//! 3. **Collisione target**: target esistente senza overwrite → `skipped`
//! 4. **Dry-run**: → `preview`, nessuna scrittura
//! 5. **Directory**: creazione idempotente della directory del target
//! 6. **Decode** (+ estrazione EXIF se richiesta)
//! 7. **Normalizzazione colore** per il formato di destinazione
//! 8. **Encode** in un file temporaneo accanto al target
//! 9. **Size regression**: risultato non più piccolo (e non conversione forzata) → temp rimosso
//! 10. **Pubblicazione atomica**: permessi copiati dal sorgente, rename del temp sul target → `success`
//!
//! ## Error handling:
//! - `transform` non fallisce mai: ogni errore dei passi 5-10 diventa un esito `failed`
//! - Il temp file viene rimosso al drop se il rename non avviene, quindi il
//!   target resta assente o nello stato precedente
//!
//! ## Concorrenza:
//! - Nessuno stato condiviso tra chiamate: più worker usano lo stesso
//!   `Transcoder` in parallelo senza coordinazione

use crate::codec::{normalize_color, EncodeRequest, ImageCodec, TargetFormat};
use crate::config::{normalized_extension, TransformConfig};
use crate::error::TranscodeError;
use crate::file_manager::FileManager;
use crate::outcome::{FileOutcome, WorkItem};
use regex_lite::Regex;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// `_<digits>%` at the end of a file stem
fn quality_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"_\d+%$").expect("quality tag pattern is a valid regex"))
}

/// Whether a file name already carries a quality tag, for any quality value
pub fn is_quality_tagged(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| quality_tag_pattern().is_match(&stem.to_string_lossy()))
        .unwrap_or(false)
}

/// Stateless per-file transform
#[derive(Clone)]
pub struct Transcoder {
    config: Arc<TransformConfig>,
    codec: Arc<dyn ImageCodec>,
}

impl Transcoder {
    pub fn new(config: TransformConfig, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            config: Arc::new(config),
            codec,
        }
    }

    /// Transform one work item. Never panics on I/O or codec errors.
    pub fn transform(&self, item: &WorkItem) -> FileOutcome {
        let source = item.source();
        let target = item.target();
        let extension = normalized_extension(source).unwrap_or_default();

        if self.config.is_excluded(&extension) {
            return FileOutcome::skipped(source, format!("unsupported format (.{})", extension));
        }

        if self.config.output_root.is_none() && is_quality_tagged(source) {
            return FileOutcome::skipped(source, "already processed");
        }

        if target.exists() && !self.config.overwrite {
            return FileOutcome::skipped(
                source,
                format!("target exists: {}", FileManager::display_name(target)),
            );
        }

        let original_size = match FileManager::file_size(source) {
            Ok(size) => size,
            Err(e) => return FileOutcome::failed(source, e),
        };

        if self.config.dry_run {
            return FileOutcome::preview(source, target, original_size);
        }

        match self.encode_and_publish(item, &extension, original_size) {
            Ok(outcome) => outcome,
            Err(e) => FileOutcome::failed(source, e),
        }
    }

    fn encode_and_publish(
        &self,
        item: &WorkItem,
        extension: &str,
        original_size: u64,
    ) -> Result<FileOutcome, TranscodeError> {
        let source = item.source();
        let target = item.target();

        FileManager::ensure_parent_dirs(target)?;

        let format = TargetFormat::from_path(target).ok_or_else(|| {
            TranscodeError::UnsupportedFormat(format!("no encoder for {}", target.display()))
        })?;

        let mut decoded = self.codec.decode(source, self.config.preserve_exif)?;
        decoded.image = normalize_color(decoded.image, format);

        let mut temp = FileManager::create_temp_sibling(target)?;
        debug!("Encoding {} into {}", source.display(), temp.path().display());

        let request = EncodeRequest {
            format,
            encoding: self.config.encoding,
            exif: if self.config.preserve_exif {
                decoded.exif.as_deref()
            } else {
                None
            },
        };
        let bytes = self.codec.encode(&decoded, &request)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;

        let new_size = temp.as_file().metadata()?.len();
        let forced = self.config.is_forced_conversion(extension);

        if new_size >= original_size && !forced {
            debug!(
                "Discarding {}: {} bytes is not smaller than {} bytes",
                temp.path().display(),
                new_size,
                original_size
            );
            temp.close()?;
            return Ok(FileOutcome::size_regression(source, original_size, new_size));
        }

        FileManager::copy_permissions(source, &temp)?;
        FileManager::publish(temp, target)?;
        Ok(FileOutcome::success(source, target, original_size, new_size))
    }
}
