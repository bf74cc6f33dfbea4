//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `TranscodeError` enum per categorizzare tutti gli errori possibili
//! - Distingue errori di configurazione (fatali, prima dell'avvio) da errori per-file
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di decodifica/codifica immagini (formati corrotti, etc.)
//! - `Encode`: Errori dell'encoder WebP
//! - `Metadata`: Errori di inserimento EXIF
//! - `UnsupportedFormat`: Formato di destinazione non gestito
//! - `Config`: Configurazione non valida (quality, workers, etc.)
//! - `InvalidSize`: Filtro dimensione non parsabile
//! - `Validation`: Errori di validazione input (directory mancante, etc.)
//!
//! ## Esempio:
//! ```rust,ignore
//! if !(1..=100).contains(&quality) {
//!     return Err(TranscodeError::Config("quality must be between 1 and 100".into()));
//! }
//! ```

/// Custom error types for image transcoding
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Metadata preservation error: {0}")]
    Metadata(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid size filter: {0}")]
    InvalidSize(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
