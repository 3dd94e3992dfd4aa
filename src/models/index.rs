//! File index data structures.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current schema version of the on-disk index cache.
pub const INDEX_CACHE_VERSION: u32 = 2;

/// One physical video file, pre-digested for fuzzy lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIndexEntry {
    /// Full path to the file.
    pub path: PathBuf,
    /// Normalized file name (see `analyzer::normalize`).
    pub normalized: String,
    /// Clean title (see `analyzer::extract_clean_title`).
    pub clean_title: String,
}

/// On-disk cache of a file index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexCache {
    /// Schema version
    pub version: u32,
    /// Storage directory the index was built from
    pub storage_dir: String,
    /// Whether the whole storage tree was scanned
    pub scan_all: bool,
    /// Indexed files, in walk order
    pub files: Vec<FileIndexEntry>,
}

/// Which part of the storage tree to index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanScope {
    /// Only the canonical `Movies` and `Series` subtrees.
    MediaFolders,
    /// The whole storage tree.
    All,
}

impl ScanScope {
    /// Scope from the cache's `scanAll` flag.
    pub fn from_scan_all(scan_all: bool) -> Self {
        if scan_all {
            ScanScope::All
        } else {
            ScanScope::MediaFolders
        }
    }

    /// Whether an index built with `self` can answer a request for `requested`.
    ///
    /// A full-tree index satisfies a narrower request, never the reverse.
    pub fn covers(self, requested: ScanScope) -> bool {
        self == ScanScope::All || requested == ScanScope::MediaFolders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_covers() {
        assert!(ScanScope::All.covers(ScanScope::All));
        assert!(ScanScope::All.covers(ScanScope::MediaFolders));
        assert!(ScanScope::MediaFolders.covers(ScanScope::MediaFolders));
        assert!(!ScanScope::MediaFolders.covers(ScanScope::All));
    }

    #[test]
    fn test_cache_json_field_names() {
        let cache = IndexCache {
            version: INDEX_CACHE_VERSION,
            storage_dir: "/storage".to_string(),
            scan_all: false,
            files: vec![FileIndexEntry {
                path: PathBuf::from("/storage/Movies/a.mkv"),
                normalized: "a".to_string(),
                clean_title: "a".to_string(),
            }],
        };
        let json = serde_json::to_string(&cache).unwrap();
        assert!(json.contains("\"storageDir\""));
        assert!(json.contains("\"scanAll\""));
        assert!(json.contains("\"cleanTitle\""));
    }
}
