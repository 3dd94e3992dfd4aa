//! Integration tests for the repair service.
//!
//! Tests cover:
//! - Phase 1 repair of a renamed sibling without the index
//! - Exact original names found through the index
//! - Remakes and look-alike titles kept below the auto-repair score
//! - Cryptic original target names left out of scoring
//! - Orphaning with name collisions
//! - Log directory fallback
//! - One terminal action per broken symlink

#![cfg(unix)]

use media_curator::core::file_index::FileIndex;
use media_curator::core::repair::RepairService;
use media_curator::models::config::RepairConfig;
use media_curator::models::library::MetadataMatch;
use media_curator::models::repair::{
    BrokenSymlinkInfo, RepairActionKind, RepairDecision, TargetCandidate,
};
use media_curator::services::MetadataLookup;
use media_curator::utils::fs::walk_broken_symlinks;
use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Library {
    _tmp: TempDir,
    storage: PathBuf,
    view: PathBuf,
    trash: PathBuf,
    cache: PathBuf,
}

impl Library {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        let lib = Self {
            storage: root.join("storage"),
            view: root.join("view"),
            trash: root.join("trash"),
            cache: root.join("cache"),
            _tmp: tmp,
        };
        fs::create_dir_all(lib.storage.join("Movies")).unwrap();
        fs::create_dir_all(lib.view.join("Movies")).unwrap();
        lib
    }

    fn file(&self, rel: &str) -> PathBuf {
        let path = self.storage.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "video").unwrap();
        path
    }

    fn link(&self, rel: &str, target: &Path) -> PathBuf {
        let path = self.view.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        symlink(target, &path).unwrap();
        path
    }

    fn service(&self) -> RepairService {
        RepairService::new(&self.storage, &self.trash, FileIndex::new(&self.cache))
    }
}

#[test]
fn test_renamed_sibling_repaired_in_phase_one() {
    let lib = Library::new();
    let renamed = lib.file("Movies/Crime/Heat.1995.1080p.BluRay.mkv");
    let link = lib.link(
        "Movies/Crime/Heat.1995.1080p.mkv",
        &lib.storage.join("Movies/Crime/Heat.1995.1080p.mkv"),
    );

    let mut service = lib.service();
    let candidates = service.find_possible_targets(&link, 50.0, &[]);

    assert_eq!(candidates[0].path, renamed);
    assert!(candidates[0].score >= 60.0);
    assert!(!service.index().is_built());

    let actions = service.run_auto(&lib.view, false);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, RepairActionKind::Repaired);
    assert_eq!(fs::read_link(&link).unwrap(), renamed);
    assert_eq!(service.index().scans_performed(), 0);
}

#[test]
fn test_exact_original_name_returned_first() {
    let lib = Library::new();
    let moved = lib.file("Movies/Drama/Heat.1995.mkv");
    lib.file("Movies/Drama/Heat.1995.Remastered.mkv");
    let link = lib.link(
        "Movies/Drama/Heat.1995.mkv",
        &lib.storage.join("Movies/Old/Heat.1995.mkv"),
    );

    let mut service = lib.service();
    let candidates = service.find_possible_targets(&link, 50.0, &[]);

    assert_eq!(candidates[0].path, moved);
    assert_eq!(candidates[0].score, 100.0);
    assert!(candidates[0].exact);
    assert!(service.index().is_built());
}

#[test]
fn test_candidates_respect_media_type() {
    let lib = Library::new();
    lib.file("Series/Heat/Heat.1995.mkv");
    let link = lib.link(
        "Movies/Heat.1995.mkv",
        &lib.storage.join("Movies/Gone/Heat.1995.mkv"),
    );

    let mut service = lib.service();
    assert!(service.find_possible_targets(&link, 50.0, &[]).is_empty());
}

struct FixedLookup;

impl MetadataLookup for FixedLookup {
    fn search(&self, _title: &str, _year: Option<u16>) -> Vec<MetadataMatch> {
        vec![MetadataMatch {
            id: 1,
            title: "The Hate".to_string(),
            original_title: Some("La Haine".to_string()),
            year: Some(1995),
        }]
    }
}

#[test]
fn test_alternative_names_help_phase_one() {
    let lib = Library::new();
    let target = lib.file("Movies/Drama/La.Haine.1995.mkv");
    let link = lib.link(
        "Movies/Drama/The.Hate.mkv",
        &lib.storage.join("Movies/Drama/x7q.mkv"),
    );

    let mut service = lib.service().with_metadata(Box::new(FixedLookup));
    let names = service.alternative_names(&link);
    assert_eq!(names, vec!["The Hate".to_string(), "La Haine".to_string()]);

    let candidates = service.find_possible_targets(&link, 50.0, &names);
    assert_eq!(candidates[0].path, target);
}

#[test]
fn test_remake_is_not_auto_repaired() {
    let lib = Library::new();
    let remake = lib.file("Movies/Horror/Halloween.2018.1080p.mkv");
    let link = lib.link(
        "Movies/Horror/Halloween.1978.1080p.mkv",
        &lib.storage.join("Movies/Gone/Halloween.1978.1080p.mkv"),
    );

    let mut service = lib.service().with_config(RepairConfig {
        orphan_unmatched: false,
        ..Default::default()
    });
    let auto_score = service.config().auto_repair_score;
    let candidates = service.find_possible_targets(&link, 50.0, &[]);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].path, remake);
    assert!(candidates[0].score < auto_score);

    let actions = service.run_auto(&lib.view, false);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, RepairActionKind::Skipped);
    assert_eq!(
        fs::read_link(&link).unwrap(),
        lib.storage.join("Movies/Gone/Halloween.1978.1080p.mkv")
    );
}

#[test]
fn test_titles_sharing_a_tag_word_stay_apart() {
    let lib = Library::new();
    lib.file("Movies/Crime/The.French.Dispatch.2021.1080p.mkv");
    let link = lib.link(
        "Movies/Crime/The.French.Connection.1971.1080p.mkv",
        &lib.storage.join("Movies/Gone/The.French.Connection.1971.1080p.mkv"),
    );

    let mut service = lib.service();
    let auto_score = service.config().auto_repair_score;
    let candidates = service.find_possible_targets(&link, 0.0, &[]);

    assert!(candidates.iter().all(|c| c.score < auto_score));
}

#[test]
fn test_cryptic_original_name_is_not_scored() {
    let lib = Library::new();
    let right = lib.file("Movies/Drama/Lighthouse.2019.mkv");
    let decoy = lib.file("Movies/Drama/xq7c.mkv");
    let link = lib.link(
        "Movies/Drama/The.Lighthouse.mkv",
        &lib.storage.join("Movies/Drama/xq7b.mkv"),
    );

    let mut service = lib.service();
    let candidates = service.find_possible_targets(&link, 50.0, &[]);

    // "xq7b" against "xq7c" alone would score 75, above the right file.
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].path, right);
    assert!(candidates[0].score < 75.0);
    assert!(candidates.iter().all(|c| c.path != decoy));
    assert!(!service.index().is_built());
}

#[test]
fn test_repair_symlink_is_idempotent() {
    let lib = Library::new();
    let target = lib.file("Movies/Alien.1979.mkv");
    let link = lib.link("Movies/Alien.1979.mkv", &lib.storage.join("gone.mkv"));

    let service = lib.service();
    assert!(service.repair_symlink(&link, &target));
    assert!(service.repair_symlink(&link, &target));
    assert_eq!(fs::read_link(&link).unwrap(), target);
    assert!(!service.repair_symlink(&link, &lib.storage.join("missing.mkv")));
}

#[test]
fn test_orphan_name_collision() {
    let lib = Library::new();
    let first = lib.link("Movies/Gone.mkv", &lib.storage.join("a.mkv"));

    let service = lib.service();
    let moved = service.move_to_orphans(&first).unwrap();
    assert_eq!(moved, service.orphans_dir().join("Gone.mkv"));

    let second = lib.link("Movies/Gone.mkv", &lib.storage.join("b.mkv"));
    let moved_again = service.move_to_orphans(&second).unwrap();
    let name = moved_again.file_name().unwrap().to_string_lossy().to_string();

    assert!(name.starts_with("Gone_"));
    assert!(name.ends_with(".mkv"));
    assert!(fs::symlink_metadata(&moved).is_ok());
    assert!(fs::symlink_metadata(&second).is_err());
}

#[test]
fn test_log_falls_back_when_trash_unusable() {
    let lib = Library::new();
    let blocker = lib.storage.join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    let service =
        RepairService::new(&lib.storage, blocker.join("trash"), FileIndex::new(&lib.cache));
    let path = service.save_log(&[]).unwrap();

    assert_eq!(path.parent().unwrap(), lib.storage.join("logs"));
    let content = fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["actionsCount"], 0);
}

#[test]
fn test_run_gives_one_action_per_link() {
    let lib = Library::new();
    lib.file("Movies/Crime/Heat.1995.1080p.BluRay.mkv");
    let links = vec![
        lib.link(
            "Movies/Crime/Heat.1995.1080p.mkv",
            &lib.storage.join("Movies/Crime/Heat.1995.1080p.mkv"),
        ),
        lib.link("Movies/Zzyzx.Road.mkv", &lib.storage.join("Movies/Gone/zzyzx.mkv")),
        lib.link("Movies/qq.mkv", &lib.storage.join("nowhere/qq.mkv")),
    ];

    let mut service = lib.service().with_config(RepairConfig {
        orphan_unmatched: false,
        ..Default::default()
    });
    let actions = service.run_auto(&lib.view, false);

    assert_eq!(actions.len(), links.len());
    let seen: HashSet<&PathBuf> = actions.iter().map(|a| &a.link).collect();
    assert_eq!(seen, links.iter().collect());

    let kinds: Vec<RepairActionKind> = actions.iter().map(|a| a.action).collect();
    assert_eq!(kinds.iter().filter(|k| **k == RepairActionKind::Repaired).count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == RepairActionKind::Skipped).count(), 2);
}

#[test]
fn test_failed_repair_is_recorded_as_skipped() {
    let lib = Library::new();
    let link = lib.link("Movies/Heat.mkv", &lib.storage.join("gone.mkv"));

    let mut service = lib.service();
    let actions = service.run(&lib.view, false, |_, _| {
        RepairDecision::Repair(PathBuf::from("/nonexistent/Heat.mkv"))
    });

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].link, link);
    assert_eq!(actions[0].action, RepairActionKind::Skipped);
}

#[test]
fn test_run_can_stop_partway() {
    let lib = Library::new();
    let first = lib.link("Movies/A.mkv", &lib.storage.join("gone/a.mkv"));
    let second = lib.link("Movies/B.mkv", &lib.storage.join("gone/b.mkv"));

    let mut service = lib.service();
    let mut orphan_all = |_: &BrokenSymlinkInfo, _: &[TargetCandidate]| RepairDecision::Orphan;
    let actions: Vec<_> = walk_broken_symlinks(&lib.view)
        .take(1)
        .map(|link| service.process(link, false, &mut orphan_all))
        .collect();

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].link, first);
    assert_eq!(actions[0].action, RepairActionKind::Orphaned);
    assert!(fs::symlink_metadata(&second).is_ok());
}

#[test]
fn test_dry_run_changes_nothing() {
    let lib = Library::new();
    lib.file("Movies/Crime/Heat.1995.1080p.BluRay.mkv");
    let link = lib.link(
        "Movies/Crime/Heat.1995.1080p.mkv",
        &lib.storage.join("Movies/Crime/Heat.1995.1080p.mkv"),
    );
    lib.link("Movies/qq.mkv", &lib.storage.join("nowhere/qq.mkv"));

    let mut service = lib.service();
    let actions = service.run_auto(&lib.view, true);

    assert_eq!(actions.len(), 2);
    assert!(service.find_broken_symlinks(&lib.view).contains(&link));
    assert!(!service.orphans_dir().exists());
}

#[test]
fn test_scan_summarizes_best_candidate() {
    let lib = Library::new();
    let renamed = lib.file("Movies/Crime/Heat.1995.1080p.BluRay.mkv");
    lib.link(
        "Movies/Crime/Heat.1995.1080p.mkv",
        &lib.storage.join("Movies/Crime/Heat.1995.1080p.mkv"),
    );

    let mut service = lib.service();
    let infos = service.scan(&lib.view);

    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].best_candidate, Some(renamed));
    assert_eq!(
        infos[0].original_target,
        Some(lib.storage.join("Movies/Crime/Heat.1995.1080p.mkv"))
    );
}
