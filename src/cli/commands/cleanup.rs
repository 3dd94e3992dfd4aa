//! Cleanup command implementation.

use super::{repair_service, spinner};
use crate::core::cleanup::{
    default_report_cache_path, load_report_cache, save_report_cache, CleanupService,
};
use crate::models::cleanup::{BatchOutcome, CleanupReport};
use crate::models::config::Config;
use crate::services::catalog_file::CatalogFile;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

/// Analyze the view and, with `apply`, correct what was found.
pub fn cleanup(
    config: &Config,
    apply: bool,
    max_per_dir: Option<usize>,
    catalog_path: Option<&Path>,
) -> Result<()> {
    let video_dir = &config.paths.video_dir;
    let max_per_dir = max_per_dir.unwrap_or(config.cleanup.max_per_dir).max(1);

    let catalog = match catalog_path {
        Some(path) => CatalogFile::load(path)?,
        None => {
            println!(
                "{}",
                "[WARN] No catalog given; misplaced symlinks cannot be detected".yellow()
            );
            CatalogFile::default()
        }
    };

    println!("{}", "[CLEANUP] Analyzing view...".bold().cyan());
    println!("  View: {}", video_dir.display());
    println!("  Max per directory: {}", max_per_dir);
    println!();

    let mut repair = repair_service(config);
    let mut service = CleanupService::new(&mut repair, &catalog, &catalog);
    let cache_path = default_report_cache_path();

    let cached = if apply {
        load_report_cache(&cache_path, video_dir, config.cleanup.report_max_age_minutes)
    } else {
        None
    };

    let report = match cached {
        Some(report) => {
            println!("  Reusing analysis from {}", cache_path.display());
            report
        }
        None => {
            let pb = spinner("Scanning view...");
            let report = service.analyze(video_dir, max_per_dir)?;
            pb.finish_and_clear();
            if let Err(e) = save_report_cache(&cache_path, video_dir, &report) {
                tracing::warn!("Could not cache cleanup report: {}", e);
            }
            report
        }
    };

    print_report(&report);

    if !report.has_issues() {
        println!();
        println!("{}", "Nothing to clean up.".green());
        return Ok(());
    }
    if !apply {
        println!();
        println!("  Run again with --apply to correct these issues");
        return Ok(());
    }

    println!();
    println!("{}", "[CLEANUP] Applying corrections...".bold().cyan());
    print_outcome(
        "Broken symlinks",
        &service.repair_broken_symlinks(&report.broken_symlinks),
    );
    print_outcome(
        "Misplaced symlinks",
        &service.fix_misplaced_symlinks(&report.misplaced_symlinks),
    );
    print_outcome(
        "Duplicate symlinks",
        &service.fix_duplicate_symlinks(&report.duplicate_symlinks),
    );
    print_outcome(
        "Subdivided entries",
        &service.subdivide_oversized_dirs(&report.oversized_dirs),
    );
    print_outcome("Empty directories", &service.clean_empty_dirs(&report.empty_dirs));

    // The tree changed; a later apply must rescan.
    let _ = std::fs::remove_file(&cache_path);

    println!();
    println!("{}", "[CLEANUP] Complete!".bold().green());
    Ok(())
}

fn print_report(report: &CleanupReport) {
    println!("{}", "Cleanup report".bold());
    println!("{}", "=".repeat(50));

    println!("  Broken symlinks: {}", report.broken_symlinks.len());
    for info in &report.broken_symlinks {
        match info.best_candidate {
            Some(ref candidate) => println!(
                "    {} -> {} ({:.0})",
                info.symlink_path.display(),
                candidate.display(),
                info.candidate_score
            ),
            None => println!("    {} (no candidate)", info.symlink_path.display()),
        }
    }

    println!("  Misplaced symlinks: {}", report.misplaced_symlinks.len());
    for item in &report.misplaced_symlinks {
        println!(
            "    {}: {} -> {}",
            item.media_title.bold(),
            item.current_dir.display(),
            item.expected_dir.display()
        );
    }

    let duplicates: usize = report.duplicate_symlinks.iter().map(|d| d.remove.len()).sum();
    println!("  Duplicate symlinks: {}", duplicates);
    for group in &report.duplicate_symlinks {
        for link in &group.remove {
            println!("    {} (keeping {})", link.display(), group.keep.display());
        }
    }

    println!("  Oversized directories: {}", report.oversized_dirs.len());
    for plan in &report.oversized_dirs {
        let labels: Vec<String> = plan
            .ranges
            .iter()
            .map(|(first, last)| format!("{}-{}", first, last))
            .collect();
        println!(
            "    {} ({} > {}): {}",
            plan.parent_dir.display(),
            plan.current_count,
            plan.max_allowed,
            labels.join(", ")
        );
    }

    println!("  Empty directories: {}", report.empty_dirs.len());
    for dir in &report.empty_dirs {
        println!("    {}", dir.display());
    }

    println!("{}", "-".repeat(50));
    println!("  Unmatched symlinks: {}", report.unmatched_count);
    println!("  Total issues: {}", report.issue_count());
}

fn print_outcome(label: &str, outcome: &BatchOutcome) {
    let failed = if outcome.failed > 0 {
        format!("{} failed", outcome.failed).red()
    } else {
        "0 failed".normal()
    };
    println!("  {}: {} done, {}", label, outcome.succeeded, failed);
    for error in &outcome.errors {
        println!("    {}", error.red());
    }
}
