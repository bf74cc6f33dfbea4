//! # Image Transcoder Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `path_filter`: Discovery dei file candidati (estensione, profondità, dimensione)
//! - `outcome`: `WorkItem` e `FileOutcome` scambiati tra worker e aggregatore
//! - `transcoder`: Trasformazione di un singolo file con pubblicazione atomica
//! - `codec`: Decode/encode JPEG, PNG e WebP
//! - `metadata`: Lettura e inserimento EXIF
//! - `file_manager`: Operazioni sui file (temp, rename, dimensioni)
//! - `optimizer`: Orchestratore, pipeline concorrente e risoluzione dei path
//! - `progress`: `RunSummary`, `Reporter` e progress bar
//! - `json_output`: Reporter JSON per uso programmatico
//! - `utils`: Parsing delle dimensioni con suffisso
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use image_transcoder::{Config, ImageOptimizer, ProgressReporter};
//!
//! let config = Config::default();
//! let optimizer = ImageOptimizer::new(&path, config)?;
//! let summary = optimizer.run(&ProgressReporter::new()).await?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod metadata;
pub mod optimizer;
pub mod outcome;
pub mod path_filter;
pub mod progress;
pub mod transcoder;
pub mod utils;

pub use config::{Config, Encoding, TransformConfig};
pub use error::TranscodeError;
pub use json_output::JsonReporter;
pub use optimizer::ImageOptimizer;
pub use outcome::{FileOutcome, OutcomeStatus, WorkItem};
pub use progress::{ProgressReporter, Reporter, RunSummary};
