//! # Path Filter Module
//!
//! Discovery dei file candidati: decide, dal path, dall'estensione, dalla
//! dimensione e dalla profondità, se un file va processato.
//!
//! ## Regole:
//! - Profondità di un file = numero di directory tra la root e il file
//!   (`max_depth = 0` → solo figli diretti della root, `None` → illimitata)
//! - Una directory viene saltata, con tutto il suo contenuto, se il nome
//!   inizia con `.` o `__` oppure è in `exclude_dirs` (es. la cartella di
//!   output di una run precedente)
//! - Un file è candidato se l'estensione (lowercase) è supportata e la
//!   dimensione è nei limiti `[min_size, max_size]` (estremi inclusi)
//! - File la cui dimensione non è leggibile vengono esclusi in silenzio
//!
//! L'ordine del risultato non ha significato.

use crate::config::{normalized_extension, Config};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Selects candidate files under a root directory
#[derive(Debug, Clone)]
pub struct PathFilter {
    extensions: HashSet<String>,
    exclude_dirs: HashSet<String>,
    max_depth: Option<usize>,
    min_size: Option<u64>,
    max_size: Option<u64>,
}

impl PathFilter {
    /// Filter accepting the given extensions, with no other restriction
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_dirs: HashSet::new(),
            max_depth: None,
            min_size: None,
            max_size: None,
        }
    }

    /// Filter built from the discovery settings of a configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.supported_extensions())
            .with_exclude_dirs(config.exclude_dirs.iter().cloned())
            .with_max_depth(config.max_depth)
            .with_size_bounds(config.min_size, config.max_size)
    }

    pub fn with_exclude_dirs<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.exclude_dirs.extend(names);
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_size_bounds(mut self, min_size: Option<u64>, max_size: Option<u64>) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    /// Find every candidate file under `root`
    pub fn enumerate(&self, root: &Path) -> Vec<PathBuf> {
        let mut walker = WalkDir::new(root).min_depth(1);
        if let Some(max_depth) = self.max_depth {
            // walkdir counts the root's children as depth 1
            walker = walker.max_depth(max_depth + 1);
        }

        let mut files = Vec::new();
        for entry in walker
            .into_iter()
            .filter_entry(|e| !self.is_skipped_entry(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !self.accepts_extension(path) {
                continue;
            }
            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    debug!("Cannot read size of {}, excluding: {}", path.display(), e);
                    continue;
                }
            };
            if !self.accepts_size(size) {
                debug!("Size {} out of bounds, excluding: {}", size, path.display());
                continue;
            }
            files.push(path.to_path_buf());
        }

        files
    }

    /// Whether a directory with this name is pruned from the walk
    pub fn is_skipped_dir(&self, name: &str) -> bool {
        name.starts_with('.') || name.starts_with("__") || self.exclude_dirs.contains(name)
    }

    /// Whether the path has a supported extension
    pub fn accepts_extension(&self, path: &Path) -> bool {
        normalized_extension(path)
            .map(|ext| self.extensions.contains(&ext))
            .unwrap_or(false)
    }

    /// Whether a size lies within the configured bounds
    pub fn accepts_size(&self, size: u64) -> bool {
        self.min_size.map_or(true, |min| size >= min) && self.max_size.map_or(true, |max| size <= max)
    }

    fn is_skipped_entry(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self.is_skipped_dir(&entry.file_name().to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path, size: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; size]).unwrap();
    }

    fn names(mut files: Vec<PathBuf>, root: &Path) -> Vec<String> {
        files.sort();
        files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let filter = PathFilter::new(["jpg", ".PNG"]);
        assert!(filter.accepts_extension(Path::new("a.jpg")));
        assert!(filter.accepts_extension(Path::new("a.JPG")));
        assert!(filter.accepts_extension(Path::new("a.png")));
        assert!(!filter.accepts_extension(Path::new("a.txt")));
        assert!(!filter.accepts_extension(Path::new("noext")));
    }

    #[test]
    fn test_max_depth() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("d0.jpg"), 10);
        touch(&root.join("one/d1.jpg"), 10);
        touch(&root.join("one/two/d2.jpg"), 10);

        let filter = PathFilter::new(["jpg"]).with_max_depth(Some(1));
        assert_eq!(names(filter.enumerate(root), root), vec!["d0.jpg", "one/d1.jpg"]);

        let filter = PathFilter::new(["jpg"]).with_max_depth(Some(0));
        assert_eq!(names(filter.enumerate(root), root), vec!["d0.jpg"]);

        let filter = PathFilter::new(["jpg"]);
        assert_eq!(filter.enumerate(root).len(), 3);
    }

    #[test]
    fn test_size_bounds() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("small.jpg"), 500);
        touch(&root.join("medium.jpg"), 5 * 1024);
        touch(&root.join("large.jpg"), 20 * 1024);

        let filter = PathFilter::new(["jpg"]).with_size_bounds(Some(1024), Some(10 * 1024));
        assert_eq!(names(filter.enumerate(root), root), vec!["medium.jpg"]);
    }

    #[test]
    fn test_size_bounds_are_inclusive() {
        let filter = PathFilter::new(["jpg"]).with_size_bounds(Some(1024), Some(2048));
        assert!(filter.accepts_size(1024));
        assert!(filter.accepts_size(2048));
        assert!(!filter.accepts_size(1023));
        assert!(!filter.accepts_size(2049));
        assert!(PathFilter::new(["jpg"]).accepts_size(0));
    }

    #[test]
    fn test_hidden_and_excluded_dirs_are_pruned() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("keep.png"), 10);
        touch(&root.join(".git/objects/x.png"), 10);
        touch(&root.join("__pycache__/y.png"), 10);
        touch(&root.join("webpimage/nested/z.png"), 10);
        touch(&root.join("album/.thumbs/t.png"), 10);
        touch(&root.join("album/ok.png"), 10);

        let filter = PathFilter::new(["png"]).with_exclude_dirs(vec!["webpimage".to_string()]);
        assert_eq!(
            names(filter.enumerate(root), root),
            vec!["album/ok.png", "keep.png"]
        );
    }

    #[test]
    fn test_hidden_root_is_still_walked() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join(".photos");
        touch(&root.join("a.jpg"), 10);

        let filter = PathFilter::new(["jpg"]);
        assert_eq!(filter.enumerate(&root).len(), 1);
    }

    #[test]
    fn test_unsupported_extensions_are_ignored() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("a.jpg"), 10);
        touch(&root.join("notes.txt"), 10);
        touch(&root.join("clip.mp4"), 10);

        let config = Config::default();
        let filter = PathFilter::from_config(&config);
        assert_eq!(names(filter.enumerate(root), root), vec!["a.jpg"]);
    }
}
