//! CLI command implementations.

pub mod cleanup;
pub mod index;
pub mod repair;
pub mod suspicious;

use crate::core::file_index::FileIndex;
use crate::core::repair::RepairService;
use crate::models::config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Repair service wired from the configuration.
pub fn repair_service(config: &Config) -> RepairService {
    let index = FileIndex::new(&config.paths.cache_dir)
        .with_progress_interval(config.index.progress_interval);

    RepairService::new(&config.paths.storage_dir, &config.paths.trash_dir, index)
        .with_config(config.repair.clone())
        .with_index_config(config.index.clone())
}

/// Spinner used while the core walks a tree.
pub(crate) fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
