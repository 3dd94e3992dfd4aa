//! Cleanup report data model.

use super::repair::BrokenSymlinkInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current schema version of the cached cleanup report.
pub const REPORT_CACHE_VERSION: u32 = 1;

/// A symlink whose directory disagrees with its entity's placement rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MisplacedSymlink {
    pub symlink_path: PathBuf,
    pub target_path: PathBuf,
    pub current_dir: PathBuf,
    pub expected_dir: PathBuf,
    pub media_title: String,
}

/// Symlinks in one directory that resolve to the same file.
///
/// `keep` is never part of `remove`; together they are every symlink of
/// `directory` resolving to `target_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSymlink {
    pub directory: PathBuf,
    pub target_path: PathBuf,
    pub keep: PathBuf,
    pub remove: Vec<PathBuf>,
}

/// How to split an oversized directory into alphabetic ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubdivisionPlan {
    pub parent_dir: PathBuf,
    pub current_count: usize,
    pub max_allowed: usize,
    /// `(first_key, last_key)` of each range, in order.
    pub ranges: Vec<(String, String)>,
    /// `(source, dest)` for every entry of the directory.
    pub items_to_move: Vec<(PathBuf, PathBuf)>,
}

/// Result of a full-tree cleanup analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub broken_symlinks: Vec<BrokenSymlinkInfo>,
    pub misplaced_symlinks: Vec<MisplacedSymlink>,
    pub duplicate_symlinks: Vec<DuplicateSymlink>,
    pub oversized_dirs: Vec<SubdivisionPlan>,
    /// Deepest first.
    pub empty_dirs: Vec<PathBuf>,
    /// Resolvable symlinks that map to no database entity.
    pub unmatched_count: usize,
}

impl CleanupReport {
    /// Whether any category has work to do.
    pub fn has_issues(&self) -> bool {
        !self.broken_symlinks.is_empty()
            || !self.misplaced_symlinks.is_empty()
            || !self.duplicate_symlinks.is_empty()
            || !self.oversized_dirs.is_empty()
            || !self.empty_dirs.is_empty()
    }

    /// Total number of flagged items across categories.
    pub fn issue_count(&self) -> usize {
        self.broken_symlinks.len()
            + self.misplaced_symlinks.len()
            + self.duplicate_symlinks.iter().map(|d| d.remove.len()).sum::<usize>()
            + self.oversized_dirs.len()
            + self.empty_dirs.len()
    }
}

/// On-disk cache of a cleanup report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCleanupReport {
    /// Schema version
    pub version: u32,
    /// View directory the report was produced for
    pub video_dir: PathBuf,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// The report itself
    pub report: CleanupReport,
}

/// Counters of a batch correction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BatchOutcome {
    /// Record a failure for one item without stopping the batch.
    pub fn fail(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.failed += 1;
        self.errors.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_has_no_issues() {
        let report = CleanupReport {
            unmatched_count: 12,
            ..Default::default()
        };
        assert!(!report.has_issues());
        assert_eq!(report.issue_count(), 0);
    }

    #[test]
    fn test_report_with_empty_dir_has_issues() {
        let report = CleanupReport {
            empty_dirs: vec![PathBuf::from("/v/Movies/Old")],
            ..Default::default()
        };
        assert!(report.has_issues());
    }

    #[test]
    fn test_tuple_fields_serialize_as_arrays() {
        let plan = SubdivisionPlan {
            parent_dir: PathBuf::from("/v/Movies/Action"),
            current_count: 2,
            max_allowed: 1,
            ranges: vec![("AB".to_string(), "AB".to_string())],
            items_to_move: vec![(
                PathBuf::from("/v/Movies/Action/Abc.mkv"),
                PathBuf::from("/v/Movies/Action/AB-AB/Abc.mkv"),
            )],
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["ranges"][0][0], "AB");
        assert_eq!(json["items_to_move"][0][1], "/v/Movies/Action/AB-AB/Abc.mkv");
    }
}
