//! Media Curator CLI
//!
//! Keeps a symlink view of a video library in step with its storage tree.

use clap::Parser;
use media_curator::cli::{
    args::{Cli, Commands},
    commands::{cleanup, index, repair, suspicious},
};
use media_curator::models::config::load_config;

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Flags override the config file
    let mut config = load_config();
    if let Some(dir) = cli.video_dir {
        config.paths.video_dir = dir;
    }
    if let Some(dir) = cli.storage_dir {
        config.paths.storage_dir = dir;
    }

    match cli.command {
        Commands::Index { force, all } => {
            config.index.scan_all |= all;
            index::build_index(&config, force)?;
        }

        Commands::Repair { dry_run, min_score } => {
            repair::repair(&config, dry_run, min_score)?;
        }

        Commands::Cleanup {
            apply,
            max_per_dir,
            catalog,
        } => {
            cleanup::cleanup(&config, apply, max_per_dir, catalog.as_deref())?;
        }

        Commands::Suspicious { catalog, limit } => {
            suspicious::suspicious(&catalog, limit)?;
        }
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("media_curator=debug")
    } else {
        EnvFilter::new("media_curator=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
