//! Library records exchanged with the persistence and metadata collaborators.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level media category of the storage and view trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movies,
    Series,
}

impl MediaKind {
    /// Canonical folder name below the storage and view roots.
    pub fn folder_name(self) -> &'static str {
        match self {
            MediaKind::Movies => "Movies",
            MediaKind::Series => "Series",
        }
    }

    /// Recognize a path segment naming a media category.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_lowercase().as_str() {
            "movies" | "films" | "movie" => Some(MediaKind::Movies),
            "series" | "tv" | "tv shows" | "tvshows" | "shows" => Some(MediaKind::Series),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movies => write!(f, "movies"),
            MediaKind::Series => write!(f, "series"),
        }
    }
}

/// A movie as stored in the library database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: i64,
    /// Localized title.
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
    /// Physical file backing the movie.
    pub file_path: Option<PathBuf>,
    /// Runtime from metadata, in minutes.
    pub runtime_minutes: Option<f64>,
    /// Probed duration of the physical file, in minutes.
    pub file_duration_minutes: Option<f64>,
    pub genre: Option<String>,
}

/// A series as stored in the library database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
    /// One physical episode file of the series.
    pub sample_file: Option<PathBuf>,
    pub genre: Option<String>,
}

/// An episode as stored in the library database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: i64,
    pub series_id: i64,
    pub series_title: String,
    pub season: u16,
    pub episode: u16,
    pub file_path: Option<PathBuf>,
    pub genre: Option<String>,
}

/// Database entity backing one physical file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LibraryEntity {
    Movie(MovieRecord),
    Episode(EpisodeRecord),
}

impl LibraryEntity {
    /// Human-readable title used in reports.
    pub fn display_title(&self) -> String {
        match self {
            LibraryEntity::Movie(movie) => match movie.year {
                Some(year) => format!("{} ({})", movie.title, year),
                None => movie.title.clone(),
            },
            LibraryEntity::Episode(ep) => {
                format!("{} S{:02}E{:02}", ep.series_title, ep.season, ep.episode)
            }
        }
    }
}

/// One result of a metadata search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataMatch {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
}
