//! Data directory layout and clip file resolution.

use std::path::{Path, PathBuf};

/// Environment variable pointing at the data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
/// Default data directory when `DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "data";
/// Sub-directory holding clip files.
pub const CLIPS_DIR: &str = "clips";
/// Default catalog database file name inside the data directory.
pub const CATALOG_FILE: &str = "catalog.sqlite";

/// Where clip files and the catalog database live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    data_dir: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Layout from `DATA_DIR`, falling back to `./data`.
    pub fn from_env() -> Self {
        let data_dir = std::env::var(DATA_DIR_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self::new(data_dir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.data_dir.join(CLIPS_DIR)
    }

    pub fn default_database(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }

    /// Locate the file backing a catalog path.
    ///
    /// Order: the path as stored; a relative path under the clips directory;
    /// for an absolute path that no longer exists, its file name under the clips
    /// directory. `None` when nothing exists on disk.
    pub fn resolve(&self, filepath: &str) -> Option<PathBuf> {
        let path = Path::new(filepath);
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        let candidate = if path.is_absolute() {
            self.clips_dir().join(path.file_name()?)
        } else {
            self.clips_dir().join(path)
        };

        if candidate.is_file() {
            Some(candidate)
        } else {
            tracing::debug!(
                filepath,
                candidate = %candidate.display(),
                "Clip file not found on disk"
            );
            None
        }
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout_with_clip(name: &str) -> (TempDir, DataLayout) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(CLIPS_DIR)).unwrap();
        std::fs::write(dir.path().join(CLIPS_DIR).join(name), b"clip").unwrap();
        let layout = DataLayout::new(dir.path());
        (dir, layout)
    }

    #[test]
    fn test_resolve_relative_path_under_clips_dir() {
        let (dir, layout) = layout_with_clip("a.mp4");
        assert_eq!(
            layout.resolve("a.mp4"),
            Some(dir.path().join(CLIPS_DIR).join("a.mp4"))
        );
    }

    #[test]
    fn test_resolve_existing_absolute_path() {
        let (dir, layout) = layout_with_clip("a.mp4");
        let absolute = dir.path().join(CLIPS_DIR).join("a.mp4");
        assert_eq!(layout.resolve(absolute.to_str().unwrap()), Some(absolute));
    }

    #[test]
    fn test_resolve_stale_absolute_path_by_file_name() {
        let (dir, layout) = layout_with_clip("a.mp4");
        assert_eq!(
            layout.resolve("/old/machine/clips/a.mp4"),
            Some(dir.path().join(CLIPS_DIR).join("a.mp4"))
        );
    }

    #[test]
    fn test_resolve_missing_file() {
        let (_dir, layout) = layout_with_clip("a.mp4");
        assert!(layout.resolve("missing.mp4").is_none());
        assert!(layout.resolve("/old/machine/clips/missing.mp4").is_none());
    }
}
