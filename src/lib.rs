//! Media Curator Library
//!
//! Keeps a symlink view of a video library in step with the physical
//! storage tree and the library database: fuzzy repair of broken links,
//! full-tree cleanup and re-checking of identified entities.

pub mod cli;
pub mod core;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
