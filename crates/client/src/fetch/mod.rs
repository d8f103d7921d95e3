//! HTTP fetch pipeline.
//!
//! ### Byte fetcher
//! - [`Fetcher`] is the seam every discovery strategy fetches through.
//! - Network, HTTP, timeout, and size failures degrade to `None` and are
//!   logged at `debug`. There are no retries.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)
//! - Per-request timeout: 20s (configurable)
//!
//! ### Conditional GET
//! - [`FetchClient::get_conditional`] sends `If-None-Match` and reports
//!   304 / 404 / 200 distinctly, for the artifact downloader.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, Response, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{SiteOrigin, UrlError, canonicalize};

use docsite_core::{AppConfig, Error};

/// Source of raw response bodies.
///
/// `None` means "no data": the caller falls through to its next strategy.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Option<Bytes>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "docsite/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "docsite/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested, canonicalized
    pub url: Url,
    pub status: StatusCode,
    pub bytes: Bytes,
}

/// Outcome of a conditional GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional {
    /// 304: the stored copy is current.
    NotModified,
    /// 404: try the next candidate.
    NotFound,
    /// 2xx with a body and the validator to store for next time.
    Fetched { bytes: Bytes, etag: Option<String> },
}

/// HTTP fetch client with redirect, timeout, and byte limits.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
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
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Fetch a URL, returning raw bytes and metadata.
    ///
    /// Non-2xx statuses are errors.
    pub async fn fetch(&self, url_str: &str) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(url_str).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let response = self
            .http
            .get(url.as_str())
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("status {}", status.as_u16())));
        }

        let final_url = response.url().clone();
        let bytes = self.read_body(response).await?;
        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            final_url,
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(FetchResponse { url, status, bytes })
    }

    /// GET `url`, sending `etag` as `If-None-Match` when given.
    ///
    /// Statuses other than 2xx, 304, and 404 are errors.
    pub async fn get_conditional(&self, url_str: &str, etag: Option<&str>) -> Result<Conditional, Error> {
        let url = canonicalize(url_str).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut request = self.http.get(url.as_str());
        if let Some(etag) = etag {
            request = request.header(header::IF_NONE_MATCH, etag);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        match status {
            StatusCode::NOT_MODIFIED => Ok(Conditional::NotModified),
            StatusCode::NOT_FOUND => Ok(Conditional::NotFound),
            s if s.is_success() => {
                let etag = response
                    .headers()
                    .get(header::ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                let bytes = self.read_body(response).await?;
                tracing::debug!("conditional GET {} -> {} ({} bytes)", url, status.as_u16(), bytes.len());
                Ok(Conditional::Fetched { bytes, etag })
            }
            s => Err(Error::HttpError(format!("status {}", s.as_u16()))),
        }
    }

    async fn read_body(&self, response: Response) -> Result<Bytes, Error> {
        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch_bytes(&self, url: &str) -> Option<Bytes> {
        match self.fetch(url).await {
            Ok(response) => Some(response.bytes),
            Err(e) => {
                tracing::debug!("fetch {} degraded to no data: {}", url, e);
                None
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() { Error::FetchTimeout(e.to_string()) } else { Error::HttpError(format!("network error: {}", e)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig { max_bytes: 64, ..FetchConfig::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "docsite/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), timeout_ms: 1500, ..AppConfig::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_fetch_bytes_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("Sitemap: /sitemap.xml")
            .create_async()
            .await;

        let bytes = client().fetch_bytes(&format!("{}/robots.txt", server.url())).await;
        assert_eq!(bytes.as_deref(), Some(&b"Sitemap: /sitemap.xml"[..]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_bytes_error_status_is_none() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/missing").with_status(500).create_async().await;

        assert!(client().fetch_bytes(&format!("{}/missing", server.url())).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/big")
            .with_status(200)
            .with_body("x".repeat(128))
            .create_async()
            .await;

        let result = client().fetch(&format!("{}/big", server.url())).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_get_conditional_statuses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/index.json")
            .match_header("if-none-match", "\"v1\"")
            .with_status(304)
            .create_async()
            .await;
        server.mock("GET", "/gone.json").with_status(404).create_async().await;
        server
            .mock("GET", "/fresh.json")
            .with_status(200)
            .with_header("etag", "\"v2\"")
            .with_body("{}")
            .create_async()
            .await;
        server.mock("GET", "/broken.json").with_status(503).create_async().await;

        let client = client();
        let base = server.url();

        let not_modified = client.get_conditional(&format!("{base}/index.json"), Some("\"v1\"")).await.unwrap();
        assert_eq!(not_modified, Conditional::NotModified);

        let not_found = client.get_conditional(&format!("{base}/gone.json"), None).await.unwrap();
        assert_eq!(not_found, Conditional::NotFound);

        let fetched = client.get_conditional(&format!("{base}/fresh.json"), None).await.unwrap();
        assert_eq!(fetched, Conditional::Fetched { bytes: Bytes::from_static(b"{}"), etag: Some("\"v2\"".into()) });

        let broken = client.get_conditional(&format!("{base}/broken.json"), None).await;
        assert!(matches!(broken, Err(Error::HttpError(_))));
    }
}
