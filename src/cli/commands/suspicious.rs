//! Suspicious-association command implementation.

use crate::core::association::AssociationChecker;
use crate::services::catalog_file::CatalogFile;
use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// List identified entities whose file names disagree with them.
pub fn suspicious(catalog_path: &Path, limit: Option<usize>) -> Result<()> {
    let catalog = CatalogFile::load(catalog_path)?;
    let checker = AssociationChecker::new(&catalog);

    println!("{}", "[CHECK] Checking identified entities...".bold().cyan());
    println!("  Catalog: {}", catalog_path.display());
    println!();

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    let mut on_progress = |done: usize, total: usize| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    };
    let results = checker.scan_suspicious(Some(&mut on_progress), limit);
    pb.finish_and_clear();

    if results.is_empty() {
        println!("{}", "No suspicious associations found.".green());
        return Ok(());
    }

    for result in &results {
        let score = format!("{:>5.1}", result.confidence_score);
        let score = if result.confidence_score < 30.0 {
            score.red()
        } else {
            score.yellow()
        };
        println!(
            "  {} {:?} #{} | stored: {} ({}) | parsed: {} ({})",
            score,
            result.entity_type,
            result.entity_id,
            result.title_stored.bold(),
            year_text(result.year_stored),
            result.title_parsed,
            year_text(result.year_parsed)
        );
        for reason in &result.reasons {
            println!("        - {}", reason);
        }
    }

    println!();
    println!("  {} suspicious associations", results.len());
    Ok(())
}

fn year_text(year: Option<u16>) -> String {
    year.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string())
}
