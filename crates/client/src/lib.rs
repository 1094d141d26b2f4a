//! Network access for offcache.
//!
//! This crate provides the [`Network`] abstraction the router fetches through,
//! its reqwest-backed implementation, and URL resolution against the
//! application origin.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchOptions, Network, resolve};
