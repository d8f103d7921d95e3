//! URL canonicalization and site origins.

use std::fmt;

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string for consistent cache keys.
///
/// Whitespace is trimmed, a missing scheme defaults to `https://`, the host
/// is lowercased, and any fragment is removed. The query string is kept as-is.
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let with_scheme = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let mut parsed = Url::parse(&with_scheme).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    if let Some(host) = parsed.host_str().map(str::to_ascii_lowercase) {
        parsed.set_host(Some(&host)).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Scheme, host, and non-default port of a site.
///
/// Sitemap cache entries and artifact `sitemaps` are keyed by its
/// [`Display`](fmt::Display) form, `https://host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteOrigin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl SiteOrigin {
    /// Origin of `url`; `None` for URLs without a host.
    pub fn of(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        Some(Self { scheme: url.scheme().to_string(), host, port: url.port() })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether `url` is served from this origin.
    pub fn contains(&self, url: &Url) -> bool {
        SiteOrigin::of(url).is_some_and(|other| other == *self)
    }

    /// Resolve an origin-relative path such as `/robots.txt`.
    pub fn join(&self, path: &str) -> Option<Url> {
        Url::parse(&self.to_string()).ok()?.join(path).ok()
    }
}

impl fmt::Display for SiteOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{}", self.scheme, self.host, port),
            None => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}
