//! Core engine: filename analysis, indexing, repair and reconciliation.

pub mod analyzer;
pub mod association;
pub mod cleanup;
pub mod confidence;
pub mod file_index;
pub mod repair;
pub mod similarity;
pub mod subdivision;
