//! Full-tree reconciliation of the symlink view.
//!
//! `analyze` only reads the tree and produces a `CleanupReport`. The
//! execution methods apply one slice of a report each and keep going
//! when a single item fails.

use super::repair::{auto_decision, RepairService};
use super::subdivision::plan_subdivision;
use crate::models::cleanup::{
    BatchOutcome, CachedCleanupReport, CleanupReport, DuplicateSymlink, MisplacedSymlink,
    SubdivisionPlan, REPORT_CACHE_VERSION,
};
use crate::models::repair::{
    BrokenSymlinkInfo, RepairAction, RepairActionKind, RepairDecision, TargetCandidate,
};
use crate::services::{LibraryCatalog, PlacementRule};
use crate::utils::fs::{
    file_name_string, is_symlink, relocate_symlink, resolve_symlink, walk_symlinks,
};
use crate::Result;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Cleanup service over the symlink view.
pub struct CleanupService<'a> {
    repair: &'a mut RepairService,
    catalog: &'a dyn LibraryCatalog,
    placement: &'a dyn PlacementRule,
}

impl<'a> CleanupService<'a> {
    pub fn new(
        repair: &'a mut RepairService,
        catalog: &'a dyn LibraryCatalog,
        placement: &'a dyn PlacementRule,
    ) -> Self {
        Self {
            repair,
            catalog,
            placement,
        }
    }

    /// Scan `video_dir` for every category of drift.
    pub fn analyze(&mut self, video_dir: &Path, max_per_dir: usize) -> Result<CleanupReport> {
        if !video_dir.exists() {
            return Err(crate::Error::PathNotFound(video_dir.display().to_string()));
        }
        if !video_dir.is_dir() {
            return Err(crate::Error::NotADirectory(video_dir.display().to_string()));
        }

        tracing::info!("Analyzing {}", video_dir.display());

        let broken_symlinks = self.repair.scan(video_dir);
        let (misplaced_symlinks, unmatched_count) = self.find_misplaced(video_dir);
        let duplicate_symlinks = find_duplicates(video_dir);
        let oversized_dirs = find_oversized(video_dir, max_per_dir);
        let empty_dirs = find_empty_dirs(video_dir);

        let report = CleanupReport {
            broken_symlinks,
            misplaced_symlinks,
            duplicate_symlinks,
            oversized_dirs,
            empty_dirs,
            unmatched_count,
        };

        tracing::info!(
            "Analysis done: {} broken, {} misplaced, {} duplicate groups, {} oversized, {} empty, {} unmatched",
            report.broken_symlinks.len(),
            report.misplaced_symlinks.len(),
            report.duplicate_symlinks.len(),
            report.oversized_dirs.len(),
            report.empty_dirs.len(),
            report.unmatched_count
        );

        Ok(report)
    }

    /// Resolvable symlinks whose directory differs from the placement rule.
    ///
    /// Also returns how many resolvable symlinks map to no entity.
    fn find_misplaced(&self, video_dir: &Path) -> (Vec<MisplacedSymlink>, usize) {
        let mut misplaced = Vec::new();
        let mut unmatched = 0;

        for link in walk_symlinks(video_dir) {
            let Some(target) = resolve_symlink(&link) else {
                continue;
            };
            let Some(entity) = self.catalog.entity_for_file(&target) else {
                tracing::debug!("No entity for {}", link.display());
                unmatched += 1;
                continue;
            };

            let expected_dir = self.placement.canonical_dir(&entity);
            if expected_dir.as_os_str().is_empty() {
                tracing::debug!("No placement for {}", link.display());
                continue;
            }

            let Some(current_dir) = link.parent() else {
                continue;
            };
            if current_dir != expected_dir {
                misplaced.push(MisplacedSymlink {
                    symlink_path: link.clone(),
                    target_path: target,
                    current_dir: current_dir.to_path_buf(),
                    expected_dir,
                    media_title: entity.display_title(),
                });
            }
        }

        misplaced.sort_by(|a, b| a.symlink_path.cmp(&b.symlink_path));
        (misplaced, unmatched)
    }

    /// Repair or orphan the broken symlinks of a report, then save a log.
    ///
    /// Uses the unattended thresholds of the repair configuration. Entries
    /// fixed since the report was made are left alone.
    pub fn repair_broken_symlinks(&mut self, items: &[BrokenSymlinkInfo]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut actions = Vec::new();
        let auto_score = self.repair.config().auto_repair_score;
        let orphan = self.repair.config().orphan_unmatched;

        for info in items {
            let link = &info.symlink_path;
            if !self.repair.is_still_broken(link) {
                tracing::debug!("No longer broken: {}", link.display());
                continue;
            }

            let candidates: Vec<_> = info
                .best_candidate
                .iter()
                .map(|path| TargetCandidate {
                    path: path.clone(),
                    score: info.candidate_score,
                    exact: false,
                })
                .collect();

            let action = match auto_decision(&candidates, auto_score, orphan) {
                RepairDecision::Repair(target) => {
                    if self.repair.repair_symlink(link, &target) {
                        outcome.succeeded += 1;
                        RepairAction::now(link.clone(), RepairActionKind::Repaired, Some(target))
                    } else {
                        outcome.fail(format!("Failed to repair {}", link.display()));
                        RepairAction::now(link.clone(), RepairActionKind::Skipped, None)
                    }
                }
                RepairDecision::Orphan => match self.repair.move_to_orphans(link) {
                    Some(dest) => {
                        outcome.succeeded += 1;
                        RepairAction::now(link.clone(), RepairActionKind::Orphaned, Some(dest))
                    }
                    None => {
                        outcome.fail(format!("Failed to orphan {}", link.display()));
                        RepairAction::now(link.clone(), RepairActionKind::Skipped, None)
                    }
                },
                RepairDecision::Skip => {
                    RepairAction::now(link.clone(), RepairActionKind::Skipped, None)
                }
            };
            actions.push(action);
        }

        if !actions.is_empty() {
            self.repair.save_log(&actions);
        }
        outcome
    }

    /// Move misplaced symlinks into their expected directories.
    pub fn fix_misplaced_symlinks(&self, items: &[MisplacedSymlink]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for item in items {
            if !is_symlink(&item.symlink_path) {
                outcome.fail(format!("Symlink gone: {}", item.symlink_path.display()));
                continue;
            }
            if let Err(e) = fs::create_dir_all(&item.expected_dir) {
                outcome.fail(format!("Cannot create {}: {}", item.expected_dir.display(), e));
                continue;
            }

            let dest = item.expected_dir.join(file_name_string(&item.symlink_path));
            if fs::symlink_metadata(&dest).is_ok() {
                outcome.fail(format!("Destination exists: {}", dest.display()));
                continue;
            }

            match relocate_symlink(&item.symlink_path, &dest) {
                Ok(()) => {
                    tracing::info!("Moved {} -> {}", item.symlink_path.display(), dest.display());
                    outcome.succeeded += 1;
                }
                Err(e) => outcome.fail(format!(
                    "Failed to move {}: {}",
                    item.symlink_path.display(),
                    e
                )),
            }
        }

        outcome
    }

    /// Delete the redundant symlinks of each duplicate group.
    pub fn fix_duplicate_symlinks(&self, items: &[DuplicateSymlink]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for group in items {
            if !is_symlink(&group.keep) {
                outcome.fail(format!(
                    "Kept symlink gone, leaving group untouched: {}",
                    group.keep.display()
                ));
                continue;
            }
            for link in &group.remove {
                if !is_symlink(link) {
                    outcome.fail(format!("Not a symlink: {}", link.display()));
                    continue;
                }
                match fs::remove_file(link) {
                    Ok(()) => {
                        tracing::info!("Removed duplicate {}", link.display());
                        outcome.succeeded += 1;
                    }
                    Err(e) => outcome.fail(format!("Failed to remove {}: {}", link.display(), e)),
                }
            }
        }

        outcome
    }

    /// Carry out subdivision plans.
    pub fn subdivide_oversized_dirs(&self, plans: &[SubdivisionPlan]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for plan in plans {
            tracing::info!(
                "Subdividing {} into {} ranges",
                plan.parent_dir.display(),
                plan.ranges.len()
            );
            for (source, dest) in &plan.items_to_move {
                if let Some(parent) = dest.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        outcome.fail(format!("Cannot create {}: {}", parent.display(), e));
                        continue;
                    }
                }
                if fs::symlink_metadata(dest).is_ok() {
                    outcome.fail(format!("Destination exists: {}", dest.display()));
                    continue;
                }
                match relocate_symlink(source, dest) {
                    Ok(()) => outcome.succeeded += 1,
                    Err(e) => outcome.fail(format!("Failed to move {}: {}", source.display(), e)),
                }
            }
        }

        outcome
    }

    /// Remove empty directories, deepest first.
    pub fn clean_empty_dirs(&self, dirs: &[PathBuf]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for dir in dirs {
            // remove_dir refuses non-empty directories
            match fs::remove_dir(dir) {
                Ok(()) => {
                    tracing::debug!("Removed empty directory {}", dir.display());
                    outcome.succeeded += 1;
                }
                Err(e) => outcome.fail(format!("Failed to remove {}: {}", dir.display(), e)),
            }
        }

        outcome
    }
}

/// Same-directory symlinks resolving to the same file.
///
/// The first link in path order is kept.
fn find_duplicates(video_dir: &Path) -> Vec<DuplicateSymlink> {
    let mut groups: BTreeMap<(PathBuf, PathBuf), Vec<PathBuf>> = BTreeMap::new();

    for link in walk_symlinks(video_dir) {
        let (Some(target), Some(parent)) = (resolve_symlink(&link), link.parent()) else {
            continue;
        };
        groups
            .entry((parent.to_path_buf(), target))
            .or_default()
            .push(link.clone());
    }

    groups
        .into_iter()
        .filter(|(_, links)| links.len() > 1)
        .map(|((directory, target_path), mut links)| {
            links.sort();
            let keep = links.remove(0);
            DuplicateSymlink {
                directory,
                target_path,
                keep,
                remove: links,
            }
        })
        .collect()
}

/// Leaf directories holding only symlinks, more than `max_per_dir` of them.
fn find_oversized(video_dir: &Path, max_per_dir: usize) -> Vec<SubdivisionPlan> {
    let mut plans = Vec::new();

    let dirs = WalkDir::new(video_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir());

    for dir in dirs {
        let Ok(read) = fs::read_dir(dir.path()) else {
            continue;
        };

        let mut links = Vec::new();
        let mut leaf = true;
        for entry in read.filter_map(|e| e.ok()) {
            match entry.file_type() {
                Ok(t) if t.is_symlink() => links.push(entry.path()),
                _ => {
                    leaf = false;
                    break;
                }
            }
        }

        if leaf && links.len() > max_per_dir {
            tracing::debug!(
                "{} holds {} symlinks (max {})",
                dir.path().display(),
                links.len(),
                max_per_dir
            );
            plans.push(plan_subdivision(dir.path(), &links, max_per_dir));
        }
    }

    plans
}

/// Directories below `video_dir` that are empty, or would be once their
/// empty subdirectories are removed. Deepest first; the root is excluded.
fn find_empty_dirs(video_dir: &Path) -> Vec<PathBuf> {
    let mut empty: Vec<PathBuf> = Vec::new();
    let mut empty_set: HashSet<PathBuf> = HashSet::new();

    let dirs = WalkDir::new(video_dir)
        .follow_links(false)
        .min_depth(1)
        .contents_first(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir());

    for dir in dirs {
        let Ok(read) = fs::read_dir(dir.path()) else {
            continue;
        };
        let mut entries = read.filter_map(|e| e.ok());
        let is_empty = entries.all(|entry| empty_set.contains(&entry.path()));
        if is_empty {
            empty_set.insert(dir.path().to_path_buf());
            empty.push(dir.into_path());
        }
    }

    // contents_first yields children before parents; make depth order strict
    empty.sort_by(|a, b| {
        b.components()
            .count()
            .cmp(&a.components().count())
            .then_with(|| a.cmp(b))
    });
    empty
}

/// Default location of the cached cleanup report.
pub fn default_report_cache_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".media_curator")
        .join("cleanup_report.json")
}

/// Save a report for a later apply pass.
pub fn save_report_cache(path: &Path, video_dir: &Path, report: &CleanupReport) -> Result<()> {
    let cached = CachedCleanupReport {
        version: REPORT_CACHE_VERSION,
        video_dir: video_dir.to_path_buf(),
        created_at: Utc::now(),
        report: report.clone(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&cached)?)?;
    tracing::debug!("Cleanup report cached at {}", path.display());
    Ok(())
}

/// Load a cached report made for `video_dir` at most `max_age_minutes` ago.
///
/// Any mismatch or read problem is a miss.
pub fn load_report_cache(
    path: &Path,
    video_dir: &Path,
    max_age_minutes: i64,
) -> Option<CleanupReport> {
    let content = fs::read_to_string(path).ok()?;
    let cached: CachedCleanupReport = match serde_json::from_str(&content) {
        Ok(cached) => cached,
        Err(e) => {
            tracing::debug!("Ignoring unreadable report cache: {}", e);
            return None;
        }
    };

    if cached.version != REPORT_CACHE_VERSION {
        tracing::debug!("Report cache version {} is outdated", cached.version);
        return None;
    }
    if cached.video_dir != video_dir {
        tracing::debug!("Report cache belongs to {}", cached.video_dir.display());
        return None;
    }
    if Utc::now() - cached.created_at > Duration::minutes(max_age_minutes) {
        tracing::debug!("Report cache is stale");
        return None;
    }

    Some(cached.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_dirs_cascade() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("Movies/Old/Deeper")).unwrap();
        fs::create_dir_all(root.join("Movies/Kept")).unwrap();
        fs::write(root.join("Movies/Kept/note.txt"), "x").unwrap();

        let empty = find_empty_dirs(root);
        assert_eq!(
            empty,
            vec![root.join("Movies/Old/Deeper"), root.join("Movies/Old")]
        );
    }

    #[test]
    fn test_empty_root_is_not_reported() {
        let tmp = TempDir::new().unwrap();
        assert!(find_empty_dirs(tmp.path()).is_empty());
    }

    #[test]
    fn test_report_cache_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.json");
        let report = CleanupReport {
            empty_dirs: vec![PathBuf::from("/v/Movies/Old")],
            unmatched_count: 3,
            ..Default::default()
        };

        save_report_cache(&path, Path::new("/v"), &report).unwrap();
        assert_eq!(load_report_cache(&path, Path::new("/v"), 10), Some(report));
        assert_eq!(load_report_cache(&path, Path::new("/other"), 10), None);
        assert_eq!(load_report_cache(&path, Path::new("/v"), -1), None);
    }

    #[test]
    fn test_report_cache_version_mismatch_is_miss() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.json");
        save_report_cache(&path, Path::new("/v"), &CleanupReport::default()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let bumped = content.replacen("\"version\": 1", "\"version\": 99", 1);
        fs::write(&path, bumped).unwrap();

        assert_eq!(load_report_cache(&path, Path::new("/v"), 10), None);
    }
}
