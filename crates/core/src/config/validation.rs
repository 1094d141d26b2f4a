//! Configuration validation rules.
//!
//! This module provides validation logic for `RouterConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::RouterConfig;
use thiserror::Error;

/// SQLite's default `SQLITE_MAX_LENGTH`; no single body can be stored past it.
const MAX_BLOB_BYTES: usize = 1_000_000_000;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn is_path_prefix(prefix: &str) -> bool {
    prefix.len() > 1 && prefix.starts_with('/') && prefix.ends_with('/')
}

impl RouterConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version` or `cache_prefix` is empty or contains whitespace
    /// - `api_prefix` or a media prefix is not of the form `/segment/`
    /// - `offline_page` is not part of the asset manifest
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds the SQLite blob limit (1GB)
    /// - `user_agent` is empty
    /// - `install_retries` exceeds 5
    ///
    /// Returns `ConfigError::Missing` if the asset manifest is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.is_empty() || self.version.chars().any(char::is_whitespace) {
            return Err(invalid("version", "must be non-empty without whitespace"));
        }
        if self.cache_prefix.is_empty() || self.cache_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("cache_prefix", "must be non-empty without whitespace"));
        }

        if !is_path_prefix(&self.api_prefix) {
            return Err(invalid("api_prefix", "must start and end with '/'"));
        }
        if self.media_prefixes.iter().any(|p| !is_path_prefix(p)) {
            return Err(invalid("media_prefixes", "every prefix must start and end with '/'"));
        }
        if self.auth_segments.iter().any(|s| s.is_empty() || s.contains('/')) {
            return Err(invalid("auth_segments", "segments must be non-empty and contain no '/'"));
        }

        if self.assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "assets".into(),
                hint: "list the application shell URLs to pre-cache".into(),
            });
        }
        if !self.assets.contains(&self.offline_page) {
            return Err(invalid("offline_page", "must be listed in assets so it is cached at install"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > MAX_BLOB_BYTES {
            return Err(invalid("max_bytes", "must not exceed 1GB (SQLite blob limit)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.install_retries > 5 {
            return Err(invalid("install_retries", "must not exceed 5"));
        }

        let unique: HashSet<&String> = self.assets.iter().collect();
        if unique.len() != self.assets.len() {
            tracing::warn!(
                assets = self.assets.len(),
                unique = unique.len(),
                "asset manifest contains duplicate entries; each is cached once"
            );
        }

        Ok(())
    }
}
