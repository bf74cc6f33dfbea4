//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path di output.
//! Il target viene calcolato una volta per file, prima dell'elaborazione,
//! così dry-run e run reale condividono la stessa logica.
//!
//! ## Modalità:
//! - **In-place**: `<stem>_<quality>%<ext>` accanto al sorgente
//! - **Mirror**: `<output_root>/<path relativo>/<stem>.<ext>`
//!
//! In entrambe le modalità le sorgenti a conversione forzata ricevono
//! l'estensione lossy normalizzata (`jpg`, oppure `webp` in modalità WebP).
//!
//! Sorgenti diverse possono risolvere allo stesso target (`a.jpg` e `a.png`
//! in modalità WebP): vince il primo item, gli altri vanno saltati.

use crate::codec::TargetFormat;
use crate::config::{normalized_extension, TransformConfig};
use crate::outcome::WorkItem;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Pair a candidate with its target path
    pub fn work_item(source: PathBuf, source_root: &Path, config: &TransformConfig) -> WorkItem {
        let target = Self::target_path(&source, source_root, config);
        WorkItem::new(source, target)
    }

    /// Calcola il path di output per un file dato
    pub fn target_path(source: &Path, source_root: &Path, config: &TransformConfig) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = Self::target_extension(source, config);

        match config.output_root {
            Some(ref output_root) => {
                // Modalità mirror: conserva la struttura relativa
                let relative_dir = match source.strip_prefix(source_root) {
                    Ok(rel) => rel.parent().unwrap_or(Path::new("")),
                    Err(e) => {
                        debug!("Strip prefix failed for {}: {} - using output root", source.display(), e);
                        Path::new("")
                    }
                };
                output_root
                    .join(relative_dir)
                    .join(Self::file_name(&stem, "", &extension))
            }
            None => {
                let tag = format!("_{}%", config.encoding.tag());
                source.with_file_name(Self::file_name(&stem, &tag, &extension))
            }
        }
    }

    /// Items whose target is already claimed by an earlier item.
    ///
    /// Maps each losing source to the source that owns the target.
    pub fn target_collisions(items: &[WorkItem]) -> HashMap<PathBuf, PathBuf> {
        let mut owners: HashMap<&Path, &Path> = HashMap::new();
        let mut collisions = HashMap::new();
        for item in items {
            match owners.entry(item.target()) {
                Entry::Vacant(slot) => {
                    slot.insert(item.source());
                }
                Entry::Occupied(owner) => {
                    debug!(
                        "{} and {} both resolve to {}",
                        owner.get().display(),
                        item.source().display(),
                        item.target().display()
                    );
                    collisions.insert(item.source().to_path_buf(), owner.get().to_path_buf());
                }
            }
        }
        collisions
    }

    /// Determina l'estensione di output basata sul modo e sulla policy dei formati
    fn target_extension(source: &Path, config: &TransformConfig) -> String {
        let lowercase = normalized_extension(source).unwrap_or_default();
        if config.convert_to_webp {
            TargetFormat::WebP.extension().to_string()
        } else if config.is_forced_conversion(&lowercase) {
            TargetFormat::Jpeg.extension().to_string()
        } else {
            // Same-format re-encode keeps the original spelling (e.g. `.JPG`)
            source
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default()
        }
    }

    fn file_name(stem: &str, tag: &str, extension: &str) -> String {
        if extension.is_empty() {
            format!("{}{}", stem, tag)
        } else {
            format!("{}{}.{}", stem, tag, extension)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config(convert_to_webp: bool, output: Option<&str>, quality: Option<u8>) -> TransformConfig {
        Config {
            convert_to_webp,
            output_path: output.map(PathBuf::from),
            quality,
            ..Default::default()
        }
        .transform_config()
    }

    #[test]
    fn test_in_place_suffix() {
        let cfg = config(false, None, Some(70));
        let target = PathResolver::target_path(Path::new("/src/a/photo.JPG"), Path::new("/src"), &cfg);
        assert_eq!(target, PathBuf::from("/src/a/photo_70%.JPG"));
    }

    #[test]
    fn test_in_place_default_quality_tag() {
        let cfg = config(false, None, None);
        let target = PathResolver::target_path(Path::new("/src/p.png"), Path::new("/src"), &cfg);
        assert_eq!(target, PathBuf::from("/src/p_70%.png"));

        let cfg = config(true, None, None);
        let target = PathResolver::target_path(Path::new("/src/p.png"), Path::new("/src"), &cfg);
        assert_eq!(target, PathBuf::from("/src/p_80%.webp"));
    }

    #[test]
    fn test_lossless_in_place_tag() {
        let cfg = Config {
            convert_to_webp: true,
            lossless: true,
            ..Default::default()
        }
        .transform_config();
        let target = PathResolver::target_path(Path::new("/src/p.png"), Path::new("/src"), &cfg);
        assert_eq!(target, PathBuf::from("/src/p_100%.webp"));
    }

    #[test]
    fn test_mirror_mode_preserves_structure() {
        let cfg = config(true, Some("/out"), Some(75));
        let target = PathResolver::target_path(
            Path::new("/src/2023/trip/IMG_001.jpg"),
            Path::new("/src"),
            &cfg,
        );
        assert_eq!(target, PathBuf::from("/out/2023/trip/IMG_001.webp"));
    }

    #[test]
    fn test_mirror_mode_same_format_keeps_name() {
        let cfg = config(false, Some("/out"), Some(60));
        let target = PathResolver::target_path(Path::new("/src/x/a.png"), Path::new("/src"), &cfg);
        assert_eq!(target, PathBuf::from("/out/x/a.png"));
    }

    #[test]
    fn test_forced_conversion_overrides_extension() {
        let cfg = config(false, None, Some(70));
        let target = PathResolver::target_path(Path::new("/src/anim.WEBP"), Path::new("/src"), &cfg);
        assert_eq!(target, PathBuf::from("/src/anim_70%.jpg"));

        let cfg = config(false, Some("/out"), Some(70));
        let target = PathResolver::target_path(Path::new("/src/d/anim.webp"), Path::new("/src"), &cfg);
        assert_eq!(target, PathBuf::from("/out/d/anim.jpg"));
    }

    #[test]
    fn test_source_outside_root_falls_back_to_output_root() {
        let cfg = config(true, Some("/out"), None);
        let target = PathResolver::target_path(Path::new("/elsewhere/a.png"), Path::new("/src"), &cfg);
        assert_eq!(target, PathBuf::from("/out/a.webp"));
    }

    #[test]
    fn test_target_collisions_keep_first_item() {
        let cfg = config(true, Some("/out"), None);
        let items: Vec<WorkItem> = ["/src/a.jpg", "/src/a.png", "/src/b.jpg", "/src/sub/a.png"]
            .iter()
            .map(|p| PathResolver::work_item(PathBuf::from(p), Path::new("/src"), &cfg))
            .collect();

        let collisions = PathResolver::target_collisions(&items);
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions.get(Path::new("/src/a.png")), Some(&PathBuf::from("/src/a.jpg")));
    }

    #[test]
    fn test_distinct_targets_do_not_collide() {
        let cfg = config(false, None, Some(70));
        let items: Vec<WorkItem> = ["/src/a.jpg", "/src/a.png", "/src/b.jpg"]
            .iter()
            .map(|p| PathResolver::work_item(PathBuf::from(p), Path::new("/src"), &cfg))
            .collect();
        assert!(PathResolver::target_collisions(&items).is_empty());
    }

    #[test]
    fn test_work_item_pairs_paths() {
        let cfg = config(false, None, Some(70));
        let item = PathResolver::work_item(PathBuf::from("/src/a.jpg"), Path::new("/src"), &cfg);
        assert_eq!(item.source(), Path::new("/src/a.jpg"));
        assert_eq!(item.target(), Path::new("/src/a_70%.jpg"));
    }
}
