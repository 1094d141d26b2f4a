//! HTTP fetch pipeline the router talks to the network through.
//!
//! ### Semantics
//! - Any HTTP status is a response; only transport failures are errors
//! - Method, headers and body of the intercepted request are forwarded
//! - `bypass_cache` forces a reload past intermediate HTTP caches
//! - Bodies are read in full whatever their size; whether one is worth caching
//!   is the cache store's call
//!
//! ### Limits
//! - Max redirects: 5
//! - Request timeout: configurable (`FETCH_TIMEOUT`)

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve, same_origin};

use offcache_core::http::Headers;
use offcache_core::{Error, Request, Response, RouterConfig};

/// Per-call fetch options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip intermediate HTTP caches (install-time reload).
    pub bypass_cache: bool,
}

impl FetchOptions {
    pub fn reload() -> Self {
        Self { bypass_cache: true }
    }
}

/// Something that can turn a request into a response over the network.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offcache/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&RouterConfig> for FetchConfig {
    fn from(config: &RouterConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    fn build(&self, request: &Request, options: FetchOptions) -> Result<reqwest::RequestBuilder, Error> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            // hop-by-hop and client-managed headers are left to reqwest
            if matches!(name.as_str(), "host" | "connection" | "content-length" | "accept-encoding") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if options.bypass_cache {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }
}

fn map_send_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

fn collect_headers(map: &header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else { continue };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, Error> {
        let start = Instant::now();
        let url = request.url.as_str();

        let response = self
            .build(request, options)?
            .send()
            .await
            .map_err(|e| map_send_error(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());

        let bytes = response.bytes().await.map_err(|e| map_send_error(url, e))?;
        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes.to_vec(),
            url: Some(final_url),
        })
    }
}
