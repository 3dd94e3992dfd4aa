//! Collaborator seams.
//!
//! The engine never talks to a database or a metadata API itself. The
//! hosting application injects these capabilities; `catalog_file` is the
//! file-backed implementation used by the command line.

pub mod catalog_file;

use crate::models::association::EntityKey;
use crate::models::library::{LibraryEntity, MetadataMatch, MovieRecord, SeriesRecord};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Metadata search used to build alternative-name hints.
pub trait MetadataLookup {
    /// Search by title, optionally narrowed by year.
    fn search(&self, title: &str, year: Option<u16>) -> Vec<MetadataMatch>;

    /// Number of episodes in a season, when known.
    fn season_episode_count(&self, _id: i64, _season: u16) -> Option<u32> {
        None
    }
}

/// Maps physical files to the database records they back.
pub trait LibraryCatalog {
    /// Entity backed by the physical file at `path`.
    fn entity_for_file(&self, path: &Path) -> Option<LibraryEntity>;
}

/// Placement policy: the directory an entity's symlink belongs in.
///
/// Must be pure; the genre and alphabetic-subdivision policy lives
/// entirely in the implementation.
pub trait PlacementRule {
    fn canonical_dir(&self, entity: &LibraryEntity) -> PathBuf;
}

impl<F> PlacementRule for F
where
    F: Fn(&LibraryEntity) -> PathBuf,
{
    fn canonical_dir(&self, entity: &LibraryEntity) -> PathBuf {
        self(entity)
    }
}

/// Already-identified entities to re-check against their file names.
pub trait AssociationSource {
    fn identified_movies(&self) -> Vec<MovieRecord>;
    fn identified_series(&self) -> Vec<SeriesRecord>;
    /// Entities a user confirmed by hand; never reported.
    fn confirmed(&self) -> HashSet<EntityKey>;
}
