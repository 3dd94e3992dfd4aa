//! Command line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Media Curator - Keep a symlink media library in step with its storage
#[derive(Parser, Debug)]
#[command(name = "media-curator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Symlink view directory (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    pub video_dir: Option<PathBuf>,

    /// Physical storage directory (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or refresh the storage file index
    Index {
        /// Ignore the cache and walk the storage tree again
        #[arg(long)]
        force: bool,

        /// Index the whole storage tree, not only Movies and Series
        #[arg(long)]
        all: bool,
    },

    /// Repair broken symlinks in the view
    Repair {
        /// Dry run - show what would be done
        #[arg(long)]
        dry_run: bool,

        /// Minimum candidate score (0-100)
        #[arg(long, value_name = "N")]
        min_score: Option<f64>,
    },

    /// Analyze the view for drift, optionally applying corrections
    Cleanup {
        /// Apply corrections (reuses a recent analysis when available)
        #[arg(long)]
        apply: bool,

        /// Maximum symlinks per directory before subdivision
        #[arg(long, value_name = "N")]
        max_per_dir: Option<usize>,

        /// Library snapshot used to detect misplaced symlinks
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },

    /// List identified entities whose file names disagree with them
    Suspicious {
        /// Library snapshot to check
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,

        /// Maximum number of entities to check
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },
}
