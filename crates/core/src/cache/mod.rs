//! Versioned cache stores for request/response snapshots.
//!
//! A cache store is a named keyed map from request identity to response
//! snapshot. Stores are scoped per deployed version; the router only ever
//! writes to the store named after the current version.
//!
//! - [`CacheStorage`]: the registry of stores (`open`, `match`, `put`, `delete`, `keys`)
//! - [`CacheDb`]: SQLite backend with async access via tokio-rusqlite
//! - [`MemoryStorage`]: in-memory backend used by tests and ephemeral runs

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::EntryMeta;
pub use memory::MemoryStorage;
pub use storage::{CacheStorage, CacheStore};

/// Name of the cache store for a deployed version, e.g. `recorder-cache-v3`.
pub fn cache_name(prefix: &str, version: &str) -> String {
    format!("{prefix}-{version}")
}
