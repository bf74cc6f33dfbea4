//! # Optimizer Module
//!
//! Modulo che separa le responsabilità in sottomoduli:
//! - `image_optimizer`: Orchestratore principale
//! - `pipeline`: Esecuzione concorrente con concorrenza limitata
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod image_optimizer;
pub mod path_resolver;
pub mod pipeline;

pub use image_optimizer::ImageOptimizer;
pub use path_resolver::PathResolver;
pub use pipeline::Pipeline;
