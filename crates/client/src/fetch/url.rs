//! URL resolution against the application origin.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a manifest entry or request target to an absolute URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (`/offline.html`, `static/app.js`) against `origin`
/// 3. Reject schemes other than http/https
/// 4. Lowercase the host
/// 5. Remove fragment (#...)
/// 6. Keep query string intact (do not reorder)
pub fn resolve(input: &str, origin: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether `url` shares scheme, host and port with `origin`.
pub fn same_origin(url: &Url, origin: &Url) -> bool {
    url.origin() == origin.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://localhost:8000/").unwrap()
    }

    #[test]
    fn test_resolve_absolute_path() {
        let url = resolve("/offline.html", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/offline.html");
    }

    #[test]
    fn test_resolve_keeps_cross_origin() {
        let url = resolve("https://cdn.jsdelivr.net/npm/vue@3/dist/vue.global.prod.js", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("cdn.jsdelivr.net"));
        assert!(!same_origin(&url, &origin()));
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve("https://CDN.Example.COM/a.css", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve("/#gallery", &origin()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_resolve_preserve_query() {
        let url = resolve("/?action=upload&b=2", &origin()).unwrap();
        assert_eq!(url.query(), Some("action=upload&b=2"));
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve("  /static/js/app.js  ", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/static/js/app.js");
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve("file:///etc/passwd", &origin());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve("", &origin()), Err(UrlError::Empty)));
        assert!(matches!(resolve("   ", &origin()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_same_origin_port_matters() {
        let other = Url::parse("http://localhost:9000/api/").unwrap();
        assert!(!same_origin(&other, &origin()));
        assert!(same_origin(&Url::parse("http://localhost:8000/api/x").unwrap(), &origin()));
    }
}
