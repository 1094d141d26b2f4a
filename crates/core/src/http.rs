//! Request and response snapshots.
//!
//! These are the values the router reasons about: a [`Request`] is what a page
//! asked for, a [`Response`] is what ends up in a cache store or goes back to
//! the page. Bodies travel hex-encoded whenever they are serialized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Lowercase header name to value. Repeated headers are joined with `", "`.
pub type Headers = BTreeMap<String, String>;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Full page load.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
    /// Any mode the router does not model (`websocket`, `webtransport`...).
    #[serde(other)]
    Other,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: Url,
    #[serde(default)]
    pub mode: RequestMode,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, rename = "body_hex", with = "hex_body::option", skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

fn default_method() -> String {
    "GET".into()
}

impl Request {
    /// A plain GET in `cors` mode.
    pub fn get(url: Url) -> Self {
        Self { method: default_method(), url, mode: RequestMode::Cors, headers: Headers::new(), body: None }
    }

    /// A GET issued as a page navigation.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// URL as used for cache identity: fragment stripped.
    pub fn cache_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }

    /// Request identity: uppercase method and fragment-less URL.
    pub fn identity(&self) -> String {
        format!("{} {}", self.method.to_ascii_uppercase(), self.cache_url())
    }
}

/// A response snapshot: status, headers, and the full body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, rename = "body_hex", with = "hex_body")]
    pub body: Vec<u8>,
    /// URL the snapshot was produced for, if it came from the network or a cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).into(),
            headers: Headers::new(),
            body: body.into(),
            url: None,
        }
    }

    /// Synthetic `text/plain` response.
    pub fn text(status: u16, body: &str) -> Self {
        Self::new(status, body.as_bytes()).with_header("content-type", "text/plain; charset=utf-8")
    }

    /// Synthetic `application/json` response.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string().into_bytes()).with_header("content-type", "application/json")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Serde adapter that writes byte bodies as lowercase hex strings.
pub mod hex_body {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(b) => serializer.serialize_some(&hex::encode(b)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
