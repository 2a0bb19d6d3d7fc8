//! Core types and shared functionality for storyshell.
//!
//! This crate provides:
//! - Cache partition store with SQLite backend
//! - Favorites store
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod favorites;

pub use cache::{CacheDb, Partition, PartitionNames, RequestKey, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use favorites::{FavoriteStory, Favorites};
