//! # Image Transcoder - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione da file e override con i flag CLI
//! - Scelta del reporter (progress bar o JSON) e avvio dell'optimizer
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory, quality, workers, filtri, etc.)
//! 2. Configura il logging su stderr (INFO o DEBUG a seconda del flag verbose)
//! 3. Chiede la directory sorgente se non è stata passata
//! 4. Carica la configurazione e applica i flag; salva se richiesto
//! 5. Istanzia ImageOptimizer e avvia la run
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-transcoder ~/Pictures --quality 75 --workers 8 --min-size 200K
//! image-transcoder ~/Pictures --webp --lossless --output ~/Pictures-webp
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use image_transcoder::json_output::JsonMessage;
use image_transcoder::progress::Reporter;
use image_transcoder::utils::parse_size;
use image_transcoder::{Config, ImageOptimizer, JsonReporter, ProgressReporter, TranscodeError};

#[derive(Parser)]
#[command(name = "image-transcoder")]
#[command(about = "Re-encode or convert image trees to smaller files, in parallel")]
struct Args {
    /// Directory containing images to transcode (asked interactively if omitted)
    source_directory: Option<PathBuf>,

    /// Lossy quality (1-100, default 70, or 80 with --webp)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Lossless WebP encoding (only with --webp)
    #[arg(long, conflicts_with = "quality")]
    lossless: bool,

    /// Convert all images to WebP
    #[arg(long)]
    webp: bool,

    /// Output directory mirroring the source tree (default: beside the source, suffix-tagged)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long)]
    overwrite: bool,

    /// Copy EXIF metadata into the output (JPEG and WebP)
    #[arg(long)]
    preserve_exif: bool,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Maximum directory depth (0 = only files directly in the source directory)
    #[arg(short = 'd', long)]
    max_depth: Option<usize>,

    /// Skip files smaller than this (e.g. 500K, 1.5MB)
    #[arg(long, value_parser = parse_size)]
    min_size: Option<u64>,

    /// Skip files larger than this (e.g. 20M, 1G)
    #[arg(long, value_parser = parse_size)]
    max_size: Option<u64>,

    /// Directory name to skip (repeatable)
    #[arg(long = "exclude-dir", value_name = "NAME")]
    exclude_dirs: Vec<String>,

    /// Dry run - show what would be written without touching any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Output progress and results as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Configuration file (default: <config dir>/image-transcoder/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the effective configuration to this file
    #[arg(long, value_name = "FILE")]
    save_config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Apply command-line flags on top of a loaded configuration
    fn apply_to(&self, config: &mut Config) {
        if let Some(quality) = self.quality {
            config.quality = Some(quality);
            config.lossless = false;
        }
        if self.lossless {
            config.lossless = true;
            config.quality = None;
        }
        config.convert_to_webp |= self.webp;
        config.overwrite |= self.overwrite;
        config.preserve_exif |= self.preserve_exif;
        config.dry_run |= self.dry_run;
        config.json_output |= self.json;

        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(ref output) = self.output {
            config.output_path = Some(output.clone());
        }
        if self.max_depth.is_some() {
            config.max_depth = self.max_depth;
        }
        if self.min_size.is_some() {
            config.min_size = self.min_size;
        }
        if self.max_size.is_some() {
            config.max_size = self.max_size;
        }
        config.exclude_dirs.extend(self.exclude_dirs.iter().cloned());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let json = args.json;
    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if json {
                JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
            }
            Err(e)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args).await?;
    args.apply_to(&mut config);
    config.validate()?;

    if let Some(ref path) = args.save_config {
        config
            .save_to_file(path)
            .await
            .with_context(|| format!("cannot save configuration to {}", path.display()))?;
        info!("Configuration saved to {}", path.display());
    }

    let source_dir = match args.source_directory {
        Some(dir) => dir,
        None => tokio::task::spawn_blocking(prompt_source_dir).await??,
    };

    let optimizer = ImageOptimizer::new(&source_dir, config.clone())?;
    let reporter: Box<dyn Reporter> = if config.json_output {
        Box::new(JsonReporter::new(optimizer.source_root().to_path_buf(), &config))
    } else {
        Box::new(ProgressReporter::new())
    };

    optimizer.run(reporter.as_ref()).await?;
    Ok(())
}

async fn load_config(args: &Args) -> Result<Config> {
    match args.config {
        Some(ref path) => {
            if !path.exists() {
                return Err(TranscodeError::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                ))
                .into());
            }
            Config::from_file(path)
                .await
                .with_context(|| format!("invalid configuration file {}", path.display()))
        }
        None => match Config::default_path() {
            Some(path) => Config::from_file(&path)
                .await
                .with_context(|| format!("invalid configuration file {}", path.display())),
            None => Ok(Config::default()),
        },
    }
}

/// Ask for the source directory on stdin
fn prompt_source_dir() -> Result<PathBuf> {
    eprint!("Directory to transcode: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim().trim_matches(&['"', '\''][..]);
    if answer.is_empty() {
        return Err(TranscodeError::Validation("no source directory given".to_string()).into());
    }
    Ok(PathBuf::from(answer))
}
