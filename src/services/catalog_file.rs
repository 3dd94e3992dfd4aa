//! JSON snapshot of the library database.
//!
//! Lets the command line run cleanup and association checks without a
//! database connection. The snapshot carries each record's canonical
//! directory, so the placement rule is a plain lookup.

use super::{AssociationSource, LibraryCatalog, PlacementRule};
use crate::models::association::{EntityKey, EntityKind};
use crate::models::library::{EpisodeRecord, LibraryEntity, MovieRecord, SeriesRecord};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// A movie row of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogMovie {
    #[serde(flatten)]
    pub record: MovieRecord,
    /// Directory its symlink belongs in.
    pub canonical_dir: PathBuf,
    #[serde(default)]
    pub confirmed: bool,
}

/// An episode row of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEpisode {
    #[serde(flatten)]
    pub record: EpisodeRecord,
    pub canonical_dir: PathBuf,
}

/// A series row of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSeries {
    #[serde(flatten)]
    pub record: SeriesRecord,
    #[serde(default)]
    pub confirmed: bool,
}

/// Snapshot file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub movies: Vec<CatalogMovie>,
    #[serde(default)]
    pub episodes: Vec<CatalogEpisode>,
    #[serde(default)]
    pub series: Vec<CatalogSeries>,
}

/// Library catalog loaded from a snapshot file.
#[derive(Debug, Default)]
pub struct CatalogFile {
    snapshot: CatalogSnapshot,
    by_file: HashMap<PathBuf, LibraryEntity>,
    movie_dirs: HashMap<i64, PathBuf>,
    episode_dirs: HashMap<i64, PathBuf>,
}

impl CatalogFile {
    /// Load a snapshot from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| crate::Error::InvalidCatalog(format!("{}: {}", path.display(), e)))?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&content)
            .map_err(|e| crate::Error::InvalidCatalog(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Build the lookup tables for a snapshot.
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut by_file = HashMap::new();
        let mut movie_dirs = HashMap::new();
        let mut episode_dirs = HashMap::new();

        for movie in &snapshot.movies {
            movie_dirs.insert(movie.record.id, movie.canonical_dir.clone());
            if let Some(ref file) = movie.record.file_path {
                by_file.insert(canonical_key(file), LibraryEntity::Movie(movie.record.clone()));
            }
        }
        for episode in &snapshot.episodes {
            episode_dirs.insert(episode.record.id, episode.canonical_dir.clone());
            if let Some(ref file) = episode.record.file_path {
                by_file.insert(
                    canonical_key(file),
                    LibraryEntity::Episode(episode.record.clone()),
                );
            }
        }

        tracing::debug!(
            "Catalog loaded: {} movies, {} episodes, {} series",
            snapshot.movies.len(),
            snapshot.episodes.len(),
            snapshot.series.len()
        );

        Self {
            snapshot,
            by_file,
            movie_dirs,
            episode_dirs,
        }
    }
}

/// Canonical form of a stored path, so it compares equal to resolved symlinks.
fn canonical_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl LibraryCatalog for CatalogFile {
    fn entity_for_file(&self, path: &Path) -> Option<LibraryEntity> {
        self.by_file
            .get(path)
            .or_else(|| self.by_file.get(&canonical_key(path)))
            .cloned()
    }
}

impl PlacementRule for CatalogFile {
    fn canonical_dir(&self, entity: &LibraryEntity) -> PathBuf {
        let stored = match entity {
            LibraryEntity::Movie(movie) => self.movie_dirs.get(&movie.id),
            LibraryEntity::Episode(ep) => self.episode_dirs.get(&ep.id),
        };
        stored.cloned().unwrap_or_default()
    }
}

impl AssociationSource for CatalogFile {
    fn identified_movies(&self) -> Vec<MovieRecord> {
        self.snapshot.movies.iter().map(|m| m.record.clone()).collect()
    }

    fn identified_series(&self) -> Vec<SeriesRecord> {
        self.snapshot.series.iter().map(|s| s.record.clone()).collect()
    }

    fn confirmed(&self) -> HashSet<EntityKey> {
        let movies = self
            .snapshot
            .movies
            .iter()
            .filter(|m| m.confirmed)
            .map(|m| (EntityKind::Movie, m.record.id));
        let series = self
            .snapshot
            .series
            .iter()
            .filter(|s| s.confirmed)
            .map(|s| (EntityKind::Series, s.record.id));
        movies.chain(series).collect()
    }
}
