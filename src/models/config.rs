//! Configuration model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library locations.
    pub paths: PathsConfig,
    /// File index configuration.
    pub index: IndexConfig,
    /// Broken-symlink repair configuration.
    pub repair: RepairConfig,
    /// Cleanup configuration.
    pub cleanup: CleanupConfig,
}

/// Library locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the curated symlink view.
    pub video_dir: PathBuf,
    /// Root of the physical storage tree.
    pub storage_dir: PathBuf,
    /// Trash directory (orphans and logs live below it).
    pub trash_dir: PathBuf,
    /// Directory holding the file index cache.
    pub cache_dir: PathBuf,
}

/// File index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Maximum age of the on-disk cache before a rebuild.
    pub max_cache_age_hours: u64,
    /// Index the whole storage tree instead of Movies/Series only.
    pub scan_all: bool,
    /// Files between two progress callbacks.
    pub progress_interval: usize,
}

/// Broken-symlink repair configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Minimum score for a candidate to be reported.
    pub min_score: f64,
    /// Minimum best score for an unattended repair.
    pub auto_repair_score: f64,
    /// Move unmatched symlinks to the orphans area during unattended runs.
    pub orphan_unmatched: bool,
}

/// Cleanup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Maximum entries in a leaf directory before subdivision.
    pub max_per_dir: usize,
    /// Validity of the cached cleanup report.
    pub report_max_age_minutes: i64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            video_dir: home.join("Videos"),
            storage_dir: home.join("Storage"),
            trash_dir: home.join("Storage").join(".trash"),
            cache_dir: default_cache_dir(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_cache_age_hours: 24,
            scan_all: false,
            progress_interval: 500,
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            min_score: 50.0,
            auto_repair_score: 85.0,
            orphan_unmatched: true,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_per_dir: 50,
            report_max_age_minutes: 10,
        }
    }
}

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("media_curator")
}

/// Default location of the file index cache.
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("media_curator")
}

/// Load configuration from file.
pub fn load_config() -> Config {
    let config_path = config_dir().join("config.toml");

    if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(content) => match parse_config(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring {}: {}", config_path.display(), e),
            },
            Err(e) => tracing::warn!("Cannot read {}: {}", config_path.display(), e),
        }
    }

    Config::default()
}

/// Parse configuration from TOML text. Missing keys take their defaults.
pub fn parse_config(content: &str) -> crate::Result<Config> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.index.max_cache_age_hours, 24);
        assert_eq!(config.index.progress_interval, 500);
        assert_eq!(config.cleanup.max_per_dir, 50);
        assert_eq!(config.cleanup.report_max_age_minutes, 10);
        assert!(config.repair.orphan_unmatched);
    }

    #[test]
    fn test_partial_config() {
        let config = parse_config(
            r#"
            [paths]
            video_dir = "/media/view"

            [cleanup]
            max_per_dir = 80
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.video_dir, PathBuf::from("/media/view"));
        assert_eq!(config.cleanup.max_per_dir, 80);
        assert_eq!(config.cleanup.report_max_age_minutes, 10);
        assert_eq!(config.repair.min_score, 50.0);
    }

    #[test]
    fn test_invalid_config() {
        assert!(parse_config("[cleanup]\nmax_per_dir = \"many\"").is_err());
    }
}
