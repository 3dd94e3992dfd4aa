//! Broken-symlink repair.
//!
//! Finds symlinks in the view tree whose target is gone and searches the
//! storage tree for the file they should point at:
//! - Phase 1 looks next to the stale target (its directory and the one
//!   above), which catches plain renames without touching the index.
//! - Phase 2 scores the whole file index, narrowed to the media kind the
//!   symlink lives under.
//!
//! A candidate whose year is more than two years away from the symlink's
//! is a different release (a remake, a sequel) and is capped below the
//! unattended repair threshold.
//!
//! Every broken symlink handled by a run ends in exactly one terminal
//! `RepairAction` (repaired, orphaned or skipped).

use super::analyzer::{extract_clean_title, extract_series_info, normalize};
use super::file_index::FileIndex;
use super::similarity::{fast_similarity, is_exact_match, slow_similarity};
use crate::models::config::{config_dir, IndexConfig, RepairConfig};
use crate::models::library::MediaKind;
use crate::models::repair::{
    BrokenSymlinkInfo, RepairAction, RepairActionKind, RepairDecision, RepairLog, TargetCandidate,
};
use crate::services::MetadataLookup;
use crate::utils::fs::{
    create_symlink, file_name_string, is_broken_symlink, is_symlink, is_writable_dir,
    list_broken_symlinks_under, list_video_files_in, read_link_target, walk_broken_symlinks,
};
use chrono::{Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Maximum number of candidates returned for one symlink.
pub const MAX_CANDIDATES: usize = 15;

/// A Phase 1 best score at or above this ends the search.
pub const PHASE1_ACCEPT_SCORE: f64 = 60.0;

/// Highest score of a candidate whose year conflicts with the symlink's.
pub const YEAR_CONFLICT_MAX_SCORE: f64 = 70.0;

/// Maximum number of alternative titles taken from the metadata lookup.
const MAX_ALTERNATIVE_NAMES: usize = 5;

/// Release noise ignored when judging whether a name is cryptic.
pub const CRYPTIC_NOISE_TERMS: &[&str] = &[
    "2160p", "1080p", "720p", "480p", "4k", "uhd", "hd", "sd", "x264", "x265", "h264", "h265",
    "hevc", "avc", "bluray", "webrip", "web", "dl", "hdtv", "dvdrip", "rarbg", "yts", "yify",
    "eztv", "ettv", "aac", "dts",
];

static CRYPTIC_NOISE_RE: Lazy<Regex> =
    Lazy::new(|| super::analyzer::word_list_regex(CRYPTIC_NOISE_TERMS));

static ISOLATED_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());

static FOUR_DIGIT_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)(?:19|20)\d{2}(?:\D|$)").unwrap());

/// Media kind and genre implied by a symlink's location in the view tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaHint {
    pub media_type: Option<MediaKind>,
    pub genre: Option<String>,
}

/// Detect media kind and genre from the first recognized category segment.
///
/// `/view/Movies/Action/Heat.mkv` gives `(Movies, Some("Action"))`.
pub fn detect_media_hint(path: &Path) -> MediaHint {
    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    for (i, segment) in segments.iter().enumerate() {
        if let Some(kind) = MediaKind::from_segment(segment) {
            // The last segment is the file itself, never a genre.
            let genre = if i + 2 < segments.len() {
                Some(segments[i + 1].clone())
            } else {
                None
            };
            return MediaHint {
                media_type: Some(kind),
                genre,
            };
        }
    }

    MediaHint::default()
}

/// Whether a file name is too cryptic to be worth comparing.
///
/// A name with a 4-digit year is never cryptic. Otherwise release noise
/// and isolated digits are removed, and the name stays usable only if a
/// word of 7+ letters or two word-like tokens remain.
pub fn is_cryptic_name(name: &str) -> bool {
    let normalized = normalize(name);
    if FOUR_DIGIT_YEAR_RE.is_match(&normalized) {
        return false;
    }

    let stripped = CRYPTIC_NOISE_RE.replace_all(&normalized, " ");
    let stripped = ISOLATED_DIGITS_RE.replace_all(&stripped, " ");
    let tokens: Vec<&str> = stripped.split_whitespace().collect();

    let has_long_word = tokens
        .iter()
        .any(|t| t.chars().all(char::is_alphabetic) && t.chars().count() >= 7);
    if has_long_word {
        return false;
    }

    tokens.iter().filter(|t| is_word_like(t)).count() < 2
}

/// Letters only, at least 20% vowels, no run of more than 3 consonants.
fn is_word_like(token: &str) -> bool {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 2 || !chars.iter().all(|c| c.is_alphabetic()) {
        return false;
    }

    let is_vowel = |c: &char| "aeiouyàâäéèêëîïôöùûü".contains(*c);
    let vowels = chars.iter().filter(|c| is_vowel(c)).count();
    if (vowels as f64) / (chars.len() as f64) < 0.2 {
        return false;
    }

    let mut run = 0;
    for c in &chars {
        if is_vowel(c) {
            run = 0;
        } else {
            run += 1;
            if run > 3 {
                return false;
            }
        }
    }
    true
}

/// Sort candidates best first; exact name matches win ties.
fn sort_candidates(candidates: &mut [TargetCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.exact.cmp(&a.exact))
            .then(a.path.cmp(&b.path))
    });
}

/// Merge two candidate lists, keeping the best score per path.
fn merge_candidates(a: Vec<TargetCandidate>, b: Vec<TargetCandidate>) -> Vec<TargetCandidate> {
    let mut by_path: HashMap<PathBuf, TargetCandidate> = HashMap::new();
    for candidate in a.into_iter().chain(b) {
        match by_path.get_mut(&candidate.path) {
            Some(existing) => {
                if candidate.score > existing.score {
                    existing.score = candidate.score;
                }
                existing.exact |= candidate.exact;
            }
            None => {
                by_path.insert(candidate.path.clone(), candidate);
            }
        }
    }
    let mut merged: Vec<TargetCandidate> = by_path.into_values().collect();
    sort_candidates(&mut merged);
    merged.truncate(MAX_CANDIDATES);
    merged
}

/// A clean title with its release year appended, so that title
/// comparisons still see the year.
fn dated_title(clean: &str, year: Option<u16>) -> String {
    match year {
        Some(year) => format!("{} {}", clean, year),
        None => clean.to_string(),
    }
}

/// Name forms of the symlink being repaired.
struct LinkNames {
    link: String,
    link_normalized: String,
    link_clean: String,
    link_year: Option<u16>,
    original: String,
    original_normalized: String,
    original_clean: String,
    original_year: Option<u16>,
    /// The original target name is readable and not cryptic.
    use_original: bool,
}

impl LinkNames {
    fn new(link: &Path, original: Option<&Path>) -> Self {
        let link_name = file_name_string(link);
        let original_name = original.map(file_name_string).unwrap_or_default();
        let use_original = !original_name.is_empty() && !is_cryptic_name(&original_name);
        if !original_name.is_empty() && !use_original {
            tracing::debug!("Ignoring cryptic original target name '{}'", original_name);
        }

        let link_year = extract_series_info(&link_name).year;
        let original_year = extract_series_info(&original_name).year;

        Self {
            link_normalized: normalize(&link_name),
            link_clean: dated_title(&extract_clean_title(&link_name), link_year),
            link_year,
            original_normalized: normalize(&original_name),
            original_clean: dated_title(&extract_clean_title(&original_name), original_year),
            original_year,
            link: link_name,
            original: original_name,
            use_original,
        }
    }

    /// Whether every known year of the symlink is more than two years
    /// away from `candidate_year`.
    fn year_conflict(&self, candidate_year: Option<u16>) -> bool {
        let Some(candidate_year) = candidate_year else {
            return false;
        };
        let original_year = self.original_year.filter(|_| self.use_original);
        let mut years = self.link_year.into_iter().chain(original_year).peekable();
        years.peek().is_some()
            && years.all(|year| (year as i32 - candidate_year as i32).abs() > 2)
    }

    /// Cap a similarity score when the candidate's year conflicts.
    fn cap_for_year(&self, score: f64, candidate_year: Option<u16>) -> f64 {
        if self.year_conflict(candidate_year) {
            score.min(YEAR_CONFLICT_MAX_SCORE)
        } else {
            score
        }
    }

    /// Exact match against the symlink name or its original target name.
    fn is_exact(&self, candidate_name: &str) -> bool {
        is_exact_match(candidate_name, &self.link)
            || (!self.original.is_empty() && is_exact_match(candidate_name, &self.original))
    }
}

/// Repair service for the symlink view.
pub struct RepairService {
    storage_dir: PathBuf,
    trash_dir: PathBuf,
    config: RepairConfig,
    index_config: IndexConfig,
    index: FileIndex,
    metadata: Option<Box<dyn MetadataLookup>>,
}

impl RepairService {
    /// Create a repair service with default configuration.
    pub fn new(
        storage_dir: impl Into<PathBuf>,
        trash_dir: impl Into<PathBuf>,
        index: FileIndex,
    ) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            trash_dir: trash_dir.into(),
            config: RepairConfig::default(),
            index_config: IndexConfig::default(),
            index,
            metadata: None,
        }
    }

    /// Use a custom repair configuration.
    pub fn with_config(mut self, config: RepairConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom index configuration for lazy index builds.
    pub fn with_index_config(mut self, config: IndexConfig) -> Self {
        self.index_config = config;
        self
    }

    /// Attach a metadata lookup for alternative-name hints.
    pub fn with_metadata(mut self, lookup: Box<dyn MetadataLookup>) -> Self {
        self.metadata = Some(lookup);
        self
    }

    /// Repair configuration in use.
    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// The file index (possibly not built yet).
    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    /// Directory that receives orphaned symlinks.
    pub fn orphans_dir(&self) -> PathBuf {
        self.trash_dir.join("orphans")
    }

    /// Build the file index now, reporting progress.
    pub fn build_index(
        &mut self,
        force_rebuild: bool,
        on_progress: impl FnMut(usize),
    ) -> crate::Result<usize> {
        self.index.build(
            &self.storage_dir,
            self.index_config.scan_all,
            force_rebuild,
            self.index_config.max_cache_age_hours,
            on_progress,
        )
    }

    /// Build the index on first use; a failed build leaves it empty.
    fn ensure_index(&mut self) {
        if self.index.is_built() {
            return;
        }
        if let Err(e) = self.build_index(false, |_| {}) {
            tracing::warn!("File index unavailable: {}", e);
        }
    }

    /// All broken symlinks below `video_dir`, sorted by path.
    ///
    /// `walk_broken_symlinks` yields the same paths lazily.
    pub fn find_broken_symlinks(&self, video_dir: &Path) -> Vec<PathBuf> {
        let broken = list_broken_symlinks_under(video_dir);
        tracing::info!(
            "Found {} broken symlinks under {}",
            broken.len(),
            video_dir.display()
        );
        broken
    }

    /// Alternative titles for a symlink from the metadata lookup.
    pub fn alternative_names(&self, link: &Path) -> Vec<String> {
        let Some(ref lookup) = self.metadata else {
            return Vec::new();
        };
        let info = extract_series_info(&file_name_string(link));
        if info.title.is_empty() {
            return Vec::new();
        }

        let mut names: Vec<String> = Vec::new();
        for found in lookup.search(&info.title, info.year) {
            for title in std::iter::once(found.title).chain(found.original_title) {
                let duplicate = names.iter().any(|n| n.to_lowercase() == title.to_lowercase());
                if !title.trim().is_empty() && !duplicate {
                    names.push(title);
                }
            }
        }
        names.truncate(MAX_ALTERNATIVE_NAMES);
        names
    }

    /// Candidate replacement targets for a broken symlink, best first.
    pub fn find_possible_targets(
        &mut self,
        link: &Path,
        min_score: f64,
        alternative_names: &[String],
    ) -> Vec<TargetCandidate> {
        let original = read_link_target(link);
        let names = LinkNames::new(link, original.as_deref());

        let mut targeted =
            self.targeted_search(original.as_deref(), &names, alternative_names, min_score);
        sort_candidates(&mut targeted);

        let top = targeted.first().map(|c| c.score).unwrap_or(0.0);
        if top >= PHASE1_ACCEPT_SCORE {
            tracing::debug!("Phase 1 resolved {} (best {:.1})", link.display(), top);
            targeted.truncate(MAX_CANDIDATES);
            return targeted;
        }

        let mut broad = self.broad_search(link, &names, min_score);
        sort_candidates(&mut broad);

        match (targeted.is_empty(), broad.is_empty()) {
            (false, false) => merge_candidates(targeted, broad),
            (true, _) => {
                broad.truncate(MAX_CANDIDATES);
                broad
            }
            (false, true) => {
                targeted.truncate(MAX_CANDIDATES);
                targeted
            }
        }
    }

    /// Phase 1: the stale target's directory and its parent, non-recursive.
    fn targeted_search(
        &self,
        original: Option<&Path>,
        names: &LinkNames,
        alternative_names: &[String],
        min_score: f64,
    ) -> Vec<TargetCandidate> {
        let Some(original) = original else {
            return Vec::new();
        };

        let mut dirs: Vec<&Path> = Vec::new();
        if let Some(parent) = original.parent() {
            dirs.push(parent);
            if let Some(grandparent) = parent.parent() {
                dirs.push(grandparent);
            }
        }

        let alternatives: Vec<String> = alternative_names.iter().map(|n| normalize(n)).collect();
        let mut candidates = Vec::new();

        for dir in dirs.into_iter().filter(|d| d.is_dir()) {
            for file in list_video_files_in(dir) {
                let name = file_name_string(&file);
                let exact = names.is_exact(&name);
                let score = if exact {
                    100.0
                } else {
                    let normalized = normalize(&name);
                    let mut best = fast_similarity(&names.link_normalized, &normalized)
                        .max(slow_similarity(&names.link, &name));
                    if names.use_original {
                        best = best
                            .max(fast_similarity(&names.original_normalized, &normalized))
                            .max(slow_similarity(&names.original, &name));
                    }
                    for alternative in &alternatives {
                        best = best.max(fast_similarity(alternative, &normalized));
                    }
                    names.cap_for_year(best, extract_series_info(&normalized).year)
                };

                tracing::debug!("Phase 1 candidate {} scored {:.1}", file.display(), score);
                if score >= min_score {
                    candidates.push(TargetCandidate { path: file, score, exact });
                }
            }
        }

        candidates
    }

    /// Phase 2: score the file index, narrowed to the detected media kind.
    fn broad_search(
        &mut self,
        link: &Path,
        names: &LinkNames,
        min_score: f64,
    ) -> Vec<TargetCandidate> {
        self.ensure_index();

        let hint = detect_media_hint(link);
        tracing::debug!(
            "Phase 2 for {} (type {:?}, genre {:?})",
            link.display(),
            hint.media_type,
            hint.genre
        );

        let mut candidates = Vec::new();
        for entry in self.index.by_media_type(hint.media_type) {
            let name = file_name_string(&entry.path);
            let exact = names.is_exact(&name);
            let score = if exact {
                100.0
            } else {
                let year = extract_series_info(&entry.normalized).year;
                let clean = dated_title(&entry.clean_title, year);
                let mut best = fast_similarity(&names.link_normalized, &entry.normalized)
                    .max(fast_similarity(&names.link_clean, &clean));
                if names.use_original {
                    best = best
                        .max(fast_similarity(&names.original_normalized, &entry.normalized))
                        .max(fast_similarity(&names.original_clean, &clean));
                }
                names.cap_for_year(best, year)
            };

            if score >= min_score {
                candidates.push(TargetCandidate {
                    path: entry.path.clone(),
                    score,
                    exact,
                });
            }
        }

        candidates
    }

    /// Point a symlink at a new target.
    ///
    /// The new link is created beside the old one and renamed over it, so
    /// the path is never missing. Already pointing at `new_target` is a
    /// success.
    pub fn repair_symlink(&self, link: &Path, new_target: &Path) -> bool {
        if fs::read_link(link).ok().as_deref() == Some(new_target) && new_target.exists() {
            return true;
        }
        if !new_target.exists() {
            tracing::warn!("Repair target does not exist: {}", new_target.display());
            return false;
        }

        let temp = link.with_file_name(format!(".{}.repair-tmp", file_name_string(link)));
        let _ = fs::remove_file(&temp);
        if !create_symlink(new_target, &temp) {
            return false;
        }

        match fs::rename(&temp, link) {
            Ok(()) => {
                tracing::info!("Repaired {} -> {}", link.display(), new_target.display());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to replace {}: {}", link.display(), e);
                let _ = fs::remove_file(&temp);
                false
            }
        }
    }

    /// Move a symlink (not its target) into the orphans area.
    ///
    /// A name collision gets a timestamp appended. Returns the new path.
    pub fn move_to_orphans(&self, link: &Path) -> Option<PathBuf> {
        let orphans = self.orphans_dir();
        if let Err(e) = fs::create_dir_all(&orphans) {
            tracing::warn!("Cannot create {}: {}", orphans.display(), e);
            return None;
        }

        let name = file_name_string(link);
        let mut dest = orphans.join(&name);
        if fs::symlink_metadata(&dest).is_ok() {
            let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            let (stem, ext) = match name.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
                _ => (name.clone(), String::new()),
            };
            dest = orphans.join(format!("{}_{}{}", stem, stamp, ext));
            let mut n = 1;
            while fs::symlink_metadata(&dest).is_ok() {
                n += 1;
                dest = orphans.join(format!("{}_{}_{}{}", stem, stamp, n, ext));
            }
        }

        match fs::rename(link, &dest) {
            Ok(()) => {
                tracing::info!("Orphaned {} -> {}", link.display(), dest.display());
                Some(dest)
            }
            Err(e) => {
                tracing::warn!("Failed to orphan {}: {}", link.display(), e);
                None
            }
        }
    }

    /// Write a dated JSON log of a repair run.
    ///
    /// Tries the trash directory, `storage/logs`, the config directory and
    /// the current directory in turn. Returns `None` if none is writable.
    pub fn save_log(&self, actions: &[RepairAction]) -> Option<PathBuf> {
        let log = RepairLog::new(actions);
        let content = match serde_json::to_string_pretty(&log) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Cannot serialize repair log: {}", e);
                return None;
            }
        };

        let filename = format!("repair_log_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
        let mut dirs = vec![
            self.trash_dir.clone(),
            self.storage_dir.join("logs"),
            config_dir(),
        ];
        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd);
        }

        for dir in dirs {
            if !is_writable_dir(&dir) {
                tracing::debug!("Log directory not writable: {}", dir.display());
                continue;
            }
            let path = dir.join(&filename);
            match fs::write(&path, &content) {
                Ok(()) => {
                    tracing::info!("Repair log saved to {}", path.display());
                    return Some(path);
                }
                Err(e) => tracing::debug!("Cannot write {}: {}", path.display(), e),
            }
        }

        tracing::warn!("No writable directory for the repair log");
        None
    }

    /// Summarize one broken symlink with its candidates, best first.
    pub fn inspect(&mut self, link: &Path) -> (BrokenSymlinkInfo, Vec<TargetCandidate>) {
        let min_score = self.config.min_score;
        let alternatives = self.alternative_names(link);
        let candidates = self.find_possible_targets(link, min_score, &alternatives);
        let info = BrokenSymlinkInfo {
            symlink_path: link.to_path_buf(),
            original_target: read_link_target(link),
            best_candidate: candidates.first().map(|c| c.path.clone()),
            candidate_score: candidates.first().map(|c| c.score).unwrap_or(0.0),
        };
        (info, candidates)
    }

    /// Scan the view tree and summarize each broken symlink's best candidate.
    pub fn scan(&mut self, video_dir: &Path) -> Vec<BrokenSymlinkInfo> {
        let infos: Vec<BrokenSymlinkInfo> = walk_broken_symlinks(video_dir)
            .map(|link| self.inspect(&link).0)
            .collect();
        tracing::info!("Scanned {} broken symlinks under {}", infos.len(), video_dir.display());
        infos
    }

    /// Take one broken symlink to its terminal action.
    ///
    /// `decide` sees the symlink with its candidates. A repair or orphan
    /// that fails is recorded as skipped. With `dry_run` nothing on disk
    /// changes and the decided action is returned as it would happen.
    pub fn process(
        &mut self,
        link: PathBuf,
        dry_run: bool,
        decide: &mut dyn FnMut(&BrokenSymlinkInfo, &[TargetCandidate]) -> RepairDecision,
    ) -> RepairAction {
        let (info, candidates) = self.inspect(&link);

        match decide(&info, &candidates) {
            RepairDecision::Repair(target) => {
                if dry_run || self.repair_symlink(&link, &target) {
                    RepairAction::now(link, RepairActionKind::Repaired, Some(target))
                } else {
                    RepairAction::now(link, RepairActionKind::Skipped, None)
                }
            }
            RepairDecision::Orphan if dry_run => {
                RepairAction::now(link, RepairActionKind::Orphaned, None)
            }
            RepairDecision::Orphan => match self.move_to_orphans(&link) {
                Some(dest) => RepairAction::now(link, RepairActionKind::Orphaned, Some(dest)),
                None => RepairAction::now(link, RepairActionKind::Skipped, None),
            },
            RepairDecision::Skip => RepairAction::now(link, RepairActionKind::Skipped, None),
        }
    }

    /// Drive every broken symlink below `video_dir` to a terminal action.
    ///
    /// Symlinks are discovered lazily while the run advances; a caller
    /// that wants to stop partway iterates `walk_broken_symlinks` and
    /// calls `process` itself.
    pub fn run(
        &mut self,
        video_dir: &Path,
        dry_run: bool,
        mut decide: impl FnMut(&BrokenSymlinkInfo, &[TargetCandidate]) -> RepairDecision,
    ) -> Vec<RepairAction> {
        let actions: Vec<RepairAction> = walk_broken_symlinks(video_dir)
            .map(|link| self.process(link, dry_run, &mut decide))
            .collect();
        tracing::info!("Handled {} broken symlinks under {}", actions.len(), video_dir.display());
        actions
    }

    /// Unattended run using the configured thresholds.
    pub fn run_auto(&mut self, video_dir: &Path, dry_run: bool) -> Vec<RepairAction> {
        let auto_score = self.config.auto_repair_score;
        let orphan = self.config.orphan_unmatched;
        self.run(video_dir, dry_run, |_, candidates| {
            auto_decision(candidates, auto_score, orphan)
        })
    }

    /// Whether a path is still a broken symlink (reports can go stale).
    pub fn is_still_broken(&self, link: &Path) -> bool {
        is_symlink(link) && is_broken_symlink(link)
    }
}

/// Decision of an unattended run for one symlink.
pub fn auto_decision(
    candidates: &[TargetCandidate],
    auto_repair_score: f64,
    orphan_unmatched: bool,
) -> RepairDecision {
    match candidates.first() {
        Some(best) if best.score >= auto_repair_score => RepairDecision::Repair(best.path.clone()),
        _ if orphan_unmatched => RepairDecision::Orphan,
        _ => RepairDecision::Skip,
    }
}
