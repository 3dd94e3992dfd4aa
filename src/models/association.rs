//! Suspicious association data model.

use serde::{Deserialize, Serialize};

/// Kind of an identified entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Movie,
    Series,
}

/// Identity of an entity across scans.
pub type EntityKey = (EntityKind, i64);

/// A confirmed association whose filename evidence no longer agrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousAssociation {
    pub entity_type: EntityKind,
    pub entity_id: i64,
    /// Best matching stored title.
    pub title_stored: String,
    /// Title parsed from the file name.
    pub title_parsed: String,
    pub year_stored: Option<u16>,
    pub year_parsed: Option<u16>,
    /// 0-100, lower is more suspicious.
    pub confidence_score: f64,
    pub reasons: Vec<String>,
}

impl SuspiciousAssociation {
    /// Key of the entity this result is about.
    pub fn key(&self) -> EntityKey {
        (self.entity_type, self.entity_id)
    }
}
