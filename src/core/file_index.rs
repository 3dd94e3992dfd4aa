//! File index - walking, caching and filtering the physical storage tree.
//!
//! The index is a flat list of (path, normalized name, clean title)
//! triples. Lookups are linear scans; the list is cached on disk so that
//! repeated invocations skip the storage walk entirely.

use super::analyzer::{extract_clean_title, normalize};
use crate::models::index::{FileIndexEntry, IndexCache, ScanScope, INDEX_CACHE_VERSION};
use crate::models::library::MediaKind;
use crate::utils::fs::{ensure_directory, walk_video_files};
use crate::Result;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default number of files between progress callbacks.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 500;

/// In-memory file index with an on-disk cache.
#[derive(Debug)]
pub struct FileIndex {
    cache_dir: PathBuf,
    progress_interval: usize,
    storage_dir: Option<PathBuf>,
    entries: Vec<FileIndexEntry>,
    scans: usize,
}

impl FileIndex {
    /// Create an empty index caching into `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            storage_dir: None,
            entries: Vec::new(),
            scans: 0,
        }
    }

    /// Set how many files are walked between two progress callbacks.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Cache file used for a storage directory.
    pub fn cache_path(&self, storage_dir: &Path) -> PathBuf {
        self.cache_dir
            .join(format!("file_index_{}.json", path_hash(storage_dir)))
    }

    /// Build the index, from cache when possible.
    ///
    /// A cache is used when it belongs to `storage_dir`, has the current
    /// schema version, covers the requested scope and is at most
    /// `max_cache_age_hours` old. Anything else is a miss and triggers a
    /// full walk, after which the cache is rewritten.
    ///
    /// `on_progress` receives the running file count every
    /// `progress_interval` files and once more when the walk completes.
    pub fn build(
        &mut self,
        storage_dir: &Path,
        scan_all: bool,
        force_rebuild: bool,
        max_cache_age_hours: u64,
        mut on_progress: impl FnMut(usize),
    ) -> Result<usize> {
        ensure_directory(storage_dir)?;
        let scope = ScanScope::from_scan_all(scan_all);
        let cache_path = self.cache_path(storage_dir);

        if !force_rebuild {
            if let Some(cache) = load_cache(&cache_path, storage_dir, scope, max_cache_age_hours) {
                tracing::info!(
                    "Loaded {} indexed files from cache {}",
                    cache.files.len(),
                    cache_path.display()
                );
                self.storage_dir = Some(storage_dir.to_path_buf());
                self.entries = cache.files;
                return Ok(self.entries.len());
            }
        }

        self.entries = self.scan(storage_dir, scope, &mut on_progress);
        self.storage_dir = Some(storage_dir.to_path_buf());

        let cache = IndexCache {
            version: INDEX_CACHE_VERSION,
            storage_dir: storage_dir.to_string_lossy().to_string(),
            scan_all,
            files: self.entries.clone(),
        };
        if let Err(e) = save_cache(&cache_path, &cache) {
            tracing::warn!("Failed to write index cache {}: {}", cache_path.display(), e);
        }

        Ok(self.entries.len())
    }

    /// Walk the storage tree and digest every video file.
    fn scan(
        &mut self,
        storage_dir: &Path,
        scope: ScanScope,
        on_progress: &mut dyn FnMut(usize),
    ) -> Vec<FileIndexEntry> {
        self.scans += 1;

        let roots: Vec<PathBuf> = match scope {
            ScanScope::All => vec![storage_dir.to_path_buf()],
            ScanScope::MediaFolders => [MediaKind::Movies, MediaKind::Series]
                .iter()
                .map(|kind| storage_dir.join(kind.folder_name()))
                .filter(|root| root.is_dir())
                .collect(),
        };

        let mut entries = Vec::new();
        for root in &roots {
            tracing::debug!("Indexing {}", root.display());
            for path in walk_video_files(root) {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                entries.push(FileIndexEntry {
                    normalized: normalize(&name),
                    clean_title: extract_clean_title(&name),
                    path,
                });
                if entries.len() % self.progress_interval == 0 {
                    on_progress(entries.len());
                }
            }
        }
        on_progress(entries.len());

        tracing::info!(
            "Indexed {} video files under {}",
            entries.len(),
            storage_dir.display()
        );
        entries
    }

    /// All indexed files, in walk order.
    pub fn entries(&self) -> &[FileIndexEntry] {
        &self.entries
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `build` has completed at least once.
    pub fn is_built(&self) -> bool {
        self.storage_dir.is_some()
    }

    /// Number of storage walks performed so far.
    pub fn scans_performed(&self) -> usize {
        self.scans
    }

    /// Indexed files below the folder of a media kind; all files for `None`.
    pub fn by_media_type(
        &self,
        kind: Option<MediaKind>,
    ) -> impl Iterator<Item = &FileIndexEntry> + '_ {
        let prefix = match (kind, &self.storage_dir) {
            (Some(kind), Some(storage)) => Some(storage.join(kind.folder_name())),
            _ => None,
        };
        self.entries.iter().filter(move |entry| match prefix {
            Some(ref prefix) => entry.path.starts_with(prefix),
            None => true,
        })
    }

    /// Delete the cache file of a storage directory, if any.
    pub fn clear_cache(&self, storage_dir: &Path) -> Result<()> {
        let path = self.cache_path(storage_dir);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::info!("Removed index cache {}", path.display());
        }
        Ok(())
    }
}

/// Short stable hash of a directory path, used in cache file names.
fn path_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

/// Load a cache file if it is valid for the request; any problem is a miss.
fn load_cache(
    path: &Path,
    storage_dir: &Path,
    requested: ScanScope,
    max_age_hours: u64,
) -> Option<IndexCache> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    if age >= Duration::from_secs(max_age_hours.saturating_mul(3600)) {
        tracing::debug!("Index cache {} is stale", path.display());
        return None;
    }

    let content = fs::read_to_string(path).ok()?;
    let cache: IndexCache = match serde_json::from_str(&content) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::debug!("Ignoring unreadable index cache {}: {}", path.display(), e);
            return None;
        }
    };

    if cache.version != INDEX_CACHE_VERSION {
        tracing::debug!("Index cache version {} is outdated", cache.version);
        return None;
    }
    if cache.storage_dir != storage_dir.to_string_lossy() {
        tracing::debug!("Index cache belongs to {}", cache.storage_dir);
        return None;
    }
    if !ScanScope::from_scan_all(cache.scan_all).covers(requested) {
        tracing::debug!("Index cache scope is narrower than requested");
        return None;
    }

    Some(cache)
}

/// Write a cache file, creating its directory.
fn save_cache(path: &Path, cache: &IndexCache) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string(cache)?;
    fs::write(path, content)?;
    tracing::debug!("Index cache saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_hash_is_stable() {
        let a = path_hash(Path::new("/storage"));
        assert_eq!(a, path_hash(Path::new("/storage")));
        assert_ne!(a, path_hash(Path::new("/storage2")));
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_build_missing_storage_is_error() {
        let cache = tempfile::TempDir::new().unwrap();
        let mut index = FileIndex::new(cache.path());
        let result = index.build(Path::new("/nonexistent/storage"), false, false, 24, |_| {});
        assert!(result.is_err());
        assert_eq!(index.scans_performed(), 0);
    }

    #[test]
    fn test_corrupt_cache_is_a_miss() {
        let storage = tempfile::TempDir::new().unwrap();
        let cache = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(storage.path().join("Movies")).unwrap();
        fs::write(storage.path().join("Movies").join("Heat.1995.mkv"), "x").unwrap();

        let mut index = FileIndex::new(cache.path());
        fs::create_dir_all(cache.path()).unwrap();
        fs::write(index.cache_path(storage.path()), "{ not json").unwrap();

        let count = index.build(storage.path(), false, false, 24, |_| {}).unwrap();
        assert_eq!(count, 1);
        assert_eq!(index.scans_performed(), 1);
    }
}
