//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Request/response snapshot types
//! - The cache store abstraction with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStorage, CacheStore, MemoryStorage, cache_name};
pub use config::{ConfigError, RouterConfig};
pub use error::Error;
pub use http::{Request, RequestMode, Response};
