//! Route classification for intercepted requests.
//!
//! First match wins:
//! 1. non-GET → passthrough
//! 2. API prefix + auth segment → network only
//! 3. API prefix → stale-while-revalidate
//! 4. media prefix → cache first
//! 5. navigation → network first with offline fallback
//! 6. manifest asset → cache first
//! 7. anything else → cache, then network

use std::collections::HashSet;

use offcache_client::fetch::{resolve, same_origin};
use offcache_core::{Error, Request, RequestMode, RouterConfig};
use serde::Serialize;
use url::Url;

/// Where a request is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Mutating request; never intercepted.
    Passthrough,
    Auth,
    Api,
    Media,
    Navigation,
    Asset,
    Other,
}

/// Compiled routing table.
#[derive(Debug, Clone)]
pub struct Routes {
    origin: Url,
    api_prefix: String,
    media_prefixes: Vec<String>,
    auth_segments: Vec<String>,
    manifest: Vec<Url>,
    assets: HashSet<String>,
    offline_page: Url,
}

impl Routes {
    /// Build the table, resolving manifest entries against the origin.
    pub fn from_config(config: &RouterConfig) -> Result<Self, Error> {
        let resolve_entry =
            |entry: &str| resolve(entry, &config.origin).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")));

        let mut manifest = Vec::with_capacity(config.assets.len());
        let mut assets = HashSet::new();
        for entry in &config.assets {
            let url = resolve_entry(entry)?;
            if assets.insert(url.to_string()) {
                manifest.push(url);
            }
        }

        Ok(Self {
            origin: config.origin.clone(),
            api_prefix: config.api_prefix.clone(),
            media_prefixes: config.media_prefixes.clone(),
            auth_segments: config.auth_segments.iter().map(|s| s.to_ascii_lowercase()).collect(),
            manifest,
            assets,
            offline_page: resolve_entry(&config.offline_page)?,
        })
    }

    /// Deduplicated asset manifest, in configured order.
    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    pub fn offline_page(&self) -> &Url {
        &self.offline_page
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn classify(&self, request: &Request) -> RouteClass {
        if !request.is_get() || request.mode == RequestMode::Other {
            return RouteClass::Passthrough;
        }

        let url = &request.url;
        let path = url.path();
        let local = same_origin(url, &self.origin);

        if local && path.starts_with(&self.api_prefix) {
            if self.is_auth_path(&path[self.api_prefix.len()..]) {
                return RouteClass::Auth;
            }
            return RouteClass::Api;
        }

        if local && self.media_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return RouteClass::Media;
        }

        if request.is_navigation() {
            return RouteClass::Navigation;
        }

        if self.assets.contains(&request.cache_url()) {
            return RouteClass::Asset;
        }

        RouteClass::Other
    }

    fn is_auth_path(&self, rest: &str) -> bool {
        rest.split('/')
            .any(|segment| self.auth_segments.iter().any(|auth| segment.eq_ignore_ascii_case(auth)))
    }
}
