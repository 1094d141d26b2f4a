//! Router configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::cache_name;

mod validation;

pub use validation::ConfigError;

/// Router configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Origin of the application the router sits in front of.
    ///
    /// Relative manifest entries and request URLs resolve against it.
    #[serde(default = "default_origin")]
    pub origin: Url,

    /// Deployed version tag. Bumping it replaces the cache store at activation.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix of the cache store name (`<prefix>-<version>`).
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Path prefix of the JSON API.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Path prefixes that serve audio and other media.
    #[serde(default = "default_media_prefixes")]
    pub media_prefixes: Vec<String>,

    /// Path segments under the API prefix that carry credentials or session state.
    #[serde(default = "default_auth_segments")]
    pub auth_segments: Vec<String>,

    /// Cached document served when a navigation fails with nothing cached.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// The asset manifest: the application shell seeded at install.
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// Path to the SQLite cache database.
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest response body written to a cache store. Bigger responses are
    /// still served, just never cached.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Extra attempts per manifest asset during install.
    #[serde(default = "default_install_retries")]
    pub install_retries: u32,

    /// Delay between install attempts for one asset, in milliseconds.
    #[serde(default = "default_install_retry_delay_ms")]
    pub install_retry_delay_ms: u64,

    /// Whether the host supports app shortcuts.
    #[serde(default = "default_true")]
    pub host_shortcuts: bool,
}

fn default_origin() -> Url {
    Url::parse("http://localhost:8000/").expect("static origin parses")
}

fn default_version() -> String {
    "v1".into()
}

fn default_cache_prefix() -> String {
    "recorder-cache".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_media_prefixes() -> Vec<String> {
    vec!["/audio/".into(), "/media/".into()]
}

fn default_auth_segments() -> Vec<String> {
    vec!["login".into(), "logout".into(), "auth".into()]
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_assets() -> Vec<String> {
    [
        "/",
        "/offline.html",
        "/static/css/styles.css",
        "/static/js/app.js",
        "/static/js/i18n.js",
        "/static/manifest.json",
        "/static/icons/icon-192x192.png",
        "/static/icons/icon-512x512.png",
        "https://cdn.jsdelivr.net/npm/vue@3/dist/vue.global.prod.js",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    200 * 1024 * 1024
}

fn default_install_retries() -> u32 {
    2
}

fn default_install_retry_delay_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            api_prefix: default_api_prefix(),
            media_prefixes: default_media_prefixes(),
            auth_segments: default_auth_segments(),
            offline_page: default_offline_page(),
            assets: default_assets(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            install_retries: default_install_retries(),
            install_retry_delay_ms: default_install_retry_delay_ms(),
            host_shortcuts: true,
        }
    }
}

impl RouterConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn install_retry_delay(&self) -> Duration {
        Duration::from_millis(self.install_retry_delay_ms)
    }

    /// Name of the cache store this version owns.
    pub fn current_cache_name(&self) -> String {
        cache_name(&self.cache_prefix, &self.version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFCACHE_`
    /// 2. TOML file from `OFFCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// List values given through the environment use TOML array syntax,
    /// e.g. `OFFCACHE_MEDIA_PREFIXES='["/audio/"]'`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
