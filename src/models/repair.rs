//! Broken-symlink repair data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A possible replacement target for a broken symlink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCandidate {
    /// Physical file that could back the symlink.
    pub path: PathBuf,
    /// Similarity score (0-100).
    pub score: f64,
    /// File name equals the symlink name or its original target name.
    #[serde(default)]
    pub exact: bool,
}

/// Summary of one broken symlink found by a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokenSymlinkInfo {
    /// The broken symlink.
    pub symlink_path: PathBuf,
    /// Where it used to point, if the link could be read.
    pub original_target: Option<PathBuf>,
    /// Best replacement found, if any.
    pub best_candidate: Option<PathBuf>,
    /// Score of the best candidate (0 when there is none).
    pub candidate_score: f64,
}

/// Terminal outcome for one broken symlink in a repair run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepairActionKind {
    Repaired,
    Orphaned,
    Skipped,
}

/// One logged repair action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairAction {
    /// The symlink acted upon.
    pub link: PathBuf,
    /// What happened to it.
    pub action: RepairActionKind,
    /// New target (repairs) or new location (orphans).
    pub new_target: Option<PathBuf>,
    /// When the action was taken.
    pub timestamp: DateTime<Utc>,
}

impl RepairAction {
    /// Create an action stamped with the current time.
    pub fn now(link: PathBuf, action: RepairActionKind, new_target: Option<PathBuf>) -> Self {
        Self {
            link,
            action,
            new_target,
            timestamp: Utc::now(),
        }
    }
}

/// Per-kind counters of a repair run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairSummary {
    pub repaired: usize,
    pub orphaned: usize,
    pub skipped: usize,
}

impl RepairSummary {
    /// Count the actions of a run.
    pub fn from_actions(actions: &[RepairAction]) -> Self {
        let mut summary = Self::default();
        for action in actions {
            match action.action {
                RepairActionKind::Repaired => summary.repaired += 1,
                RepairActionKind::Orphaned => summary.orphaned += 1,
                RepairActionKind::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}

/// Repair log file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairLog {
    /// Date the log was written.
    pub date: DateTime<Utc>,
    /// Number of actions.
    pub actions_count: usize,
    /// Counters per action kind.
    pub summary: RepairSummary,
    /// Actions in execution order.
    pub actions: Vec<RepairAction>,
}

impl RepairLog {
    /// Build a log for a set of actions.
    pub fn new(actions: &[RepairAction]) -> Self {
        Self {
            date: Utc::now(),
            actions_count: actions.len(),
            summary: RepairSummary::from_actions(actions),
            actions: actions.to_vec(),
        }
    }
}

/// Decision taken for one broken symlink during a repair run.
#[derive(Debug, Clone, PartialEq)]
pub enum RepairDecision {
    /// Point the symlink at this file.
    Repair(PathBuf),
    /// Move the symlink to the orphans area.
    Orphan,
    /// Leave it as it is.
    Skip,
}
