//! SQLite-backed cache partitions.
//!
//! This module provides named, persistent request → response partitions
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Lazily created partitions, enumerated and pruned by name
//! - Method + URL request keys hashed with SHA-256
//! - Single-statement writes and all-or-nothing batch writes
//! - Automatic schema migrations

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod partitions;
pub mod response;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::RequestKey;
pub use names::PartitionNames;
pub use partitions::{Partition, PartitionInfo};
pub use response::{CACHED_AT_HEADER, StoredResponse};
