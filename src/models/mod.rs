//! Data models shared across the engine.

pub mod association;
pub mod cleanup;
pub mod config;
pub mod index;
pub mod library;
pub mod repair;
