//! Index command implementation.

use super::{repair_service, spinner};
use crate::models::config::Config;
use anyhow::Result;
use colored::Colorize;

/// Build or refresh the storage file index.
pub fn build_index(config: &Config, force: bool) -> Result<()> {
    println!("{}", "[INDEX] Indexing storage...".bold().cyan());
    println!("  Storage: {}", config.paths.storage_dir.display());
    println!(
        "  Scope: {}",
        if config.index.scan_all {
            "whole tree"
        } else {
            "Movies and Series"
        }
    );
    println!();

    let mut service = repair_service(config);
    let pb = spinner("Walking storage...");
    let count = service.build_index(force, |n| pb.set_message(format!("{} files indexed", n)))?;
    pb.finish_and_clear();

    let index = service.index();
    if index.scans_performed() == 0 {
        println!("{}", "[INDEX] Loaded from cache".bold().green());
    } else {
        println!("{}", "[INDEX] Complete!".bold().green());
    }
    println!("  Video files: {}", count);
    println!(
        "  Cache: {}",
        index.cache_path(&config.paths.storage_dir).display()
    );

    Ok(())
}
