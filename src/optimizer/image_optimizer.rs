//! # Image Optimizer Main Orchestrator
//!
//! Orchestratore principale che collega discovery, risoluzione dei path,
//! pipeline concorrente e reporting.
//!
//! ## Flusso:
//! 1. Validazione della configurazione e della directory sorgente
//! 2. Discovery dei candidati (`PathFilter`), esclusa la directory di output
//! 3. Calcolo dei target (`PathResolver`), identico in dry-run e run reale;
//!    se due sorgenti condividono il target, solo la prima viene processata
//! 4. Esecuzione concorrente (`Pipeline`) del `Transcoder`
//! 5. Reporting finale tramite il `Reporter` scelto dal chiamante

use crate::{
    codec::{ImageCodec, ImageCrateCodec},
    config::{Config, TransformConfig},
    error::TranscodeError,
    file_manager::FileManager,
    optimizer::{path_resolver::PathResolver, pipeline::Pipeline},
    outcome::{FileOutcome, WorkItem},
    path_filter::PathFilter,
    progress::{Reporter, RunSummary},
    transcoder::Transcoder,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestratore di una run di transcodifica
pub struct ImageOptimizer {
    config: Config,
    source_root: PathBuf,
    output_root: Option<PathBuf>,
    codec: Arc<dyn ImageCodec>,
}

impl ImageOptimizer {
    /// Crea nuova istanza dell'ottimizzatore
    pub fn new(source_dir: &Path, config: Config) -> Result<Self> {
        config.validate()?;

        if !source_dir.exists() {
            return Err(TranscodeError::Validation(format!(
                "source directory does not exist: {}",
                source_dir.display()
            ))
            .into());
        }
        if !source_dir.is_dir() {
            return Err(TranscodeError::Validation(format!(
                "source path is not a directory: {}",
                source_dir.display()
            ))
            .into());
        }

        let source_root = source_dir.canonicalize()?;
        let output_root = match config.output_path {
            Some(ref path) => Some(absolute_path(path)?),
            None => None,
        };

        Ok(Self {
            config,
            source_root,
            output_root,
            codec: Arc::new(ImageCrateCodec::new()),
        })
    }

    /// Replace the codec used by the workers
    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Transform settings with the output root made absolute
    pub fn transform_config(&self) -> TransformConfig {
        let mut transform = self.config.transform_config();
        transform.output_root = self.output_root.clone();
        transform
    }

    /// Discovery filter, with the output directory pruned when it sits under the source
    pub fn path_filter(&self) -> PathFilter {
        let mut filter = PathFilter::from_config(&self.config);
        if let Some(ref output_root) = self.output_root {
            if output_root.starts_with(&self.source_root) && output_root != &self.source_root {
                if let Some(name) = output_root.file_name() {
                    debug!("Excluding output directory from discovery: {}", output_root.display());
                    filter = filter.with_exclude_dirs([name.to_string_lossy().into_owned()]);
                }
            }
        }
        filter
    }

    /// Enumerate candidates and resolve their targets
    pub async fn work_items(&self) -> Result<Vec<WorkItem>> {
        let filter = self.path_filter();
        let root = self.source_root.clone();
        let transform = self.transform_config();

        let items = tokio::task::spawn_blocking(move || {
            let mut files = filter.enumerate(&root);
            files.sort();
            files
                .into_iter()
                .map(|source| PathResolver::work_item(source, &root, &transform))
                .collect::<Vec<_>>()
        })
        .await?;

        Ok(items)
    }

    /// Esegue il processo di transcodifica
    pub async fn run(&self, reporter: &dyn Reporter) -> Result<RunSummary> {
        self.log_configuration();

        let items = self.work_items().await?;
        if items.is_empty() && !self.config.json_output {
            info!("No images found to process");
        }

        let collisions = PathResolver::target_collisions(&items);
        let transcoder = Transcoder::new(self.transform_config(), Arc::clone(&self.codec));
        let pipeline = Pipeline::new(self.config.workers);
        let summary = pipeline
            .run(
                items,
                move |item| match collisions.get(item.source()) {
                    Some(owner) => FileOutcome::skipped(
                        item.source(),
                        format!("target collision with {}", FileManager::display_name(owner)),
                    ),
                    None => transcoder.transform(item),
                },
                self.config.dry_run,
                reporter,
            )
            .await;

        reporter.on_finish(&summary);
        Ok(summary)
    }

    /// Logga configurazione (solo se non JSON mode)
    fn log_configuration(&self) {
        if self.config.json_output {
            return;
        }

        info!("Starting image transcoding in: {}", self.source_root.display());

        let encoding = match self.config.encoding() {
            crate::config::Encoding::Lossy(quality) => format!("quality: {}", quality),
            crate::config::Encoding::Lossless => "lossless".to_string(),
        };
        if self.config.convert_to_webp {
            info!("Mode: Convert all images to WebP ({})", encoding);
        } else {
            info!("Mode: Re-encode in original formats ({})", encoding);
        }

        match self.output_root {
            Some(ref output_root) => info!("Output directory: {}", output_root.display()),
            None => info!("Output: next to the source, with quality suffix"),
        }
        if self.config.overwrite {
            info!("Overwrite mode: Will overwrite existing output files");
        }
        if self.config.preserve_exif {
            info!("EXIF metadata will be preserved where the format allows it");
        }
        if self.config.dry_run {
            info!("Dry run mode: No files will be modified");
        }
        info!("Workers: {}", self.config.workers);
    }
}

/// Absolute form of a path that may not exist yet: the deepest existing
/// ancestor is canonicalized and the missing tail appended unchanged
fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = path.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.clone()),
        }
    }

    let mut resolved = existing.canonicalize()?;
    resolved.extend(missing.iter().rev());
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DecodedImage, EncodeRequest};
    use crate::progress::SilentReporter;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    /// Codec that produces a fixed 10-byte payload for any input
    struct TinyCodec;

    impl ImageCodec for TinyCodec {
        fn decode(&self, _path: &Path, _read_exif: bool) -> std::result::Result<DecodedImage, TranscodeError> {
            Ok(DecodedImage {
                image: DynamicImage::ImageRgb8(RgbImage::new(2, 2)),
                exif: None,
            })
        }

        fn encode(
            &self,
            _image: &DecodedImage,
            _request: &EncodeRequest<'_>,
        ) -> std::result::Result<Vec<u8>, TranscodeError> {
            Ok(vec![0u8; 10])
        }
    }

    fn touch(path: &Path, size: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![1u8; size]).unwrap();
    }

    fn optimizer(dir: &Path, config: Config) -> ImageOptimizer {
        ImageOptimizer::new(dir, config).unwrap().with_codec(Arc::new(TinyCodec))
    }

    #[tokio::test]
    async fn test_in_place_scenario() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.jpg"), 100);
        touch(&dir.path().join("b_70%.png"), 100);
        touch(&dir.path().join("c.bmp"), 100);

        let summary = optimizer(dir.path(), Config::default())
            .run(&SilentReporter)
            .await
            .unwrap();

        assert_eq!(summary.success, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.total_original, 100);
        assert_eq!(summary.total_new, 10);
        assert_eq!(fs::read(dir.path().join("a_70%.jpg")).unwrap().len(), 10);
        assert!(!dir.path().join("b_70%_70%.png").exists());
        assert!(!dir.path().join("c_70%.bmp").exists());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.jpg"), 100);
        touch(&dir.path().join("sub/b.png"), 100);

        let first = optimizer(dir.path(), Config::default())
            .run(&SilentReporter)
            .await
            .unwrap();
        assert_eq!(first.success, 2);

        let second = optimizer(dir.path(), Config::default())
            .run(&SilentReporter)
            .await
            .unwrap();
        assert_eq!(second.success, 0);
        assert_eq!(second.skipped, 4);
        assert!(!dir.path().join("a_70%_70%.jpg").exists());
    }

    #[tokio::test]
    async fn test_mirror_mode_webp() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(&dir.path().join("2023/trip/IMG_001.jpg"), 100);
        touch(&dir.path().join("top.png"), 100);

        let config = Config {
            convert_to_webp: true,
            output_path: Some(out.path().to_path_buf()),
            ..Default::default()
        };
        let summary = optimizer(dir.path(), config).run(&SilentReporter).await.unwrap();

        assert_eq!(summary.success, 2);
        assert!(out.path().join("2023/trip/IMG_001.webp").exists());
        assert!(out.path().join("top.webp").exists());
        assert!(dir.path().join("2023/trip/IMG_001.jpg").exists());
    }

    #[tokio::test]
    async fn test_output_inside_source_is_not_rescanned() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.jpg"), 100);
        let out = dir.path().join("converted");

        let config = || Config {
            output_path: Some(out.clone()),
            ..Default::default()
        };
        let first = optimizer(dir.path(), config()).run(&SilentReporter).await.unwrap();
        assert_eq!(first.success, 1);
        assert!(out.join("a.jpg").exists());

        let items = optimizer(dir.path(), config()).work_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].source().ends_with("a.jpg"));
        assert!(!items[0].source().starts_with(&out.canonicalize().unwrap()));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.jpg"), 100);
        touch(&dir.path().join("x/b.png"), 100);
        let out = dir.path().join("mirror");

        let config = Config {
            dry_run: true,
            output_path: Some(out.clone()),
            ..Default::default()
        };
        let optimizer = optimizer(dir.path(), config);
        let items = optimizer.work_items().await.unwrap();
        let summary = optimizer.run(&SilentReporter).await.unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.success, 0);
        assert!(!out.exists());
        assert!(items.iter().any(|item| item.target().ends_with("x/b.png")));
    }

    /// Reporter that logs the order of lifecycle events
    #[derive(Default)]
    struct EventLog(std::sync::Mutex<Vec<String>>);

    impl Reporter for EventLog {
        fn on_start(&self, total: usize, _dry_run: bool) {
            self.0.lock().unwrap().push(format!("start {}", total));
        }

        fn on_outcome(&self, _index: usize, _total: usize, outcome: &FileOutcome) {
            self.0.lock().unwrap().push(outcome.message().to_string());
        }

        fn on_finish(&self, summary: &RunSummary) {
            self.0.lock().unwrap().push(format!("finish {}", summary.total()));
        }
    }

    #[tokio::test]
    async fn test_empty_run_still_starts_before_finishing() {
        let dir = TempDir::new().unwrap();
        let events = EventLog::default();
        optimizer(dir.path(), Config::default()).run(&events).await.unwrap();
        assert_eq!(*events.0.lock().unwrap(), vec!["start 0".to_string(), "finish 0".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_target_is_written_once() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(&dir.path().join("a.jpg"), 100);
        touch(&dir.path().join("a.png"), 100);
        touch(&dir.path().join("b.png"), 100);

        let config = Config {
            convert_to_webp: true,
            workers: 4,
            output_path: Some(out.path().to_path_buf()),
            ..Default::default()
        };
        let events = EventLog::default();
        let summary = optimizer(dir.path(), config).run(&events).await.unwrap();

        assert_eq!(summary.success, 2);
        assert_eq!(summary.skipped, 1);
        assert!(out.path().join("a.webp").exists());
        assert!(out.path().join("b.webp").exists());
        let events = events.0.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| e.starts_with("[SKIP] a.png") && e.contains("target collision with a.jpg")));
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let summary = optimizer(dir.path(), Config::default())
            .run(&SilentReporter)
            .await
            .unwrap();
        assert_eq!(summary, RunSummary::new());
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = ImageOptimizer::new(&dir.path().join("nope"), Config::default());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("does not exist"));

        touch(&dir.path().join("file.jpg"), 1);
        assert!(ImageOptimizer::new(&dir.path().join("file.jpg"), Config::default()).is_err());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            lossless: true,
            ..Default::default()
        };
        assert!(ImageOptimizer::new(dir.path(), config).is_err());
    }

    #[test]
    fn test_absolute_path_of_missing_directory() {
        let dir = TempDir::new().unwrap();
        let resolved = absolute_path(&dir.path().join("not/yet")).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("not").join("yet"));
        assert!(!dir.path().join("not").exists());
    }

    #[tokio::test]
    async fn test_real_codec_end_to_end() {
        let dir = TempDir::new().unwrap();
        let image = RgbImage::from_fn(160, 160, |x, y| {
            let v = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503)) as u8;
            Rgb([v, v.wrapping_mul(5), v.wrapping_add(37)])
        });
        let mut file = fs::File::create(dir.path().join("noise.jpg")).unwrap();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut file, 100)
            .encode(image.as_raw(), 160, 160, image::ColorType::Rgb8)
            .unwrap();
        drop(file);

        let optimizer = ImageOptimizer::new(dir.path(), Config::default()).unwrap();
        let summary = optimizer.run(&SilentReporter).await.unwrap();

        assert_eq!(summary.success, 1);
        assert!(summary.bytes_saved() > 0);
        assert!(image::open(dir.path().join("noise_70%.jpg")).is_ok());
    }
}
