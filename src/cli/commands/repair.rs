//! Repair command implementation.

use super::{repair_service, spinner};
use crate::models::config::Config;
use crate::models::repair::{RepairActionKind, RepairSummary};
use anyhow::Result;
use colored::Colorize;

/// Repair every broken symlink of the view without asking.
pub fn repair(config: &Config, dry_run: bool, min_score: Option<f64>) -> Result<()> {
    let video_dir = &config.paths.video_dir;
    if !video_dir.is_dir() {
        anyhow::bail!("Video directory not found: {}", video_dir.display());
    }

    println!("{}", "[REPAIR] Repairing broken symlinks...".bold().cyan());
    println!("  View: {}", video_dir.display());
    println!("  Storage: {}", config.paths.storage_dir.display());
    if dry_run {
        println!("  {}", "Dry run - nothing will change".yellow());
    }
    println!();

    let mut repair_config = config.repair.clone();
    if let Some(score) = min_score {
        repair_config.min_score = score.clamp(0.0, 100.0);
    }
    let mut service = repair_service(config).with_config(repair_config);

    let pb = spinner("Searching for replacement targets...");
    let actions = service.run_auto(video_dir, dry_run);
    pb.finish_and_clear();

    if actions.is_empty() {
        println!("{}", "No broken symlinks found.".green());
        return Ok(());
    }

    for action in &actions {
        let tag = match action.action {
            RepairActionKind::Repaired => "REPAIRED".green(),
            RepairActionKind::Orphaned => "ORPHANED".yellow(),
            RepairActionKind::Skipped => "SKIPPED".dimmed(),
        };
        match action.new_target {
            Some(ref target) => println!(
                "  [{}] {} -> {}",
                tag,
                action.link.display(),
                target.display()
            ),
            None => println!("  [{}] {}", tag, action.link.display()),
        }
    }

    let summary = RepairSummary::from_actions(&actions);
    println!();
    println!("{}", "[REPAIR] Complete!".bold().green());
    println!("  Repaired: {}", summary.repaired);
    println!("  Orphaned: {}", summary.orphaned);
    println!("  Skipped: {}", summary.skipped);

    if !dry_run {
        match service.save_log(&actions) {
            Some(path) => println!("  Log: {}", path.display()),
            None => println!("  {}", "[WARN] Repair log could not be written".yellow()),
        }
    }

    Ok(())
}
