//! Search-index fetching.
//!
//! Candidate generation and parsing live in `docsite_core::index`; this
//! module adds the I/O around them.

use futures::future::join_all;
use url::Url;

use docsite_core::gzip;
use docsite_core::index::{IndexKind, IndexPayload, parse_index};

use crate::fetch::Fetcher;

/// Fetch and parse one index URL.
///
/// Missing bodies, parse failures, and empty indexes all read as `None`.
pub async fn fetch_index(fetcher: &dyn Fetcher, index_url: &str, kind: IndexKind) -> Option<IndexPayload> {
    let bytes = fetcher.fetch_bytes(index_url).await?;
    let body = match gzip::maybe_decompress(&bytes, index_url, gzip::MAX_INFLATED_BYTES) {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("{} index {}: {}", kind, index_url, e);
            return None;
        }
    };

    match parse_index(kind, &body) {
        Ok(payload) if payload.is_empty() => {
            tracing::debug!("{} index {} has no documents", kind, index_url);
            None
        }
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!("ignoring {} index {}: {}", kind, index_url, e);
            None
        }
    }
}

/// Fetch every candidate for `site_url` concurrently; the first valid one in
/// priority order wins.
pub async fn resolve_index(fetcher: &dyn Fetcher, site_url: &Url, kind: IndexKind) -> Option<(String, IndexPayload)> {
    let candidates = kind.candidates(site_url);
    let fetched = join_all(candidates.iter().map(|url| fetch_index(fetcher, url, kind))).await;

    candidates
        .into_iter()
        .zip(fetched)
        .find_map(|(url, payload)| payload.map(|payload| (url, payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFetcher;

    const MKDOCS_BODY: &str = r#"{"docs":[{"location":"intro/","title":"Intro","text":"Welcome"}]}"#;

    #[tokio::test]
    async fn test_resolve_prefers_deepest_candidate() {
        let fetcher = FakeFetcher::new()
            .with("https://docs.example.com/search/search_index.json", MKDOCS_BODY)
            .with("https://docs.example.com/v2/search/search_index.json", MKDOCS_BODY);

        let site = Url::parse("https://docs.example.com/v2/guide.html").unwrap();
        let (url, payload) = resolve_index(&fetcher, &site, IndexKind::MkDocs).await.unwrap();
        assert_eq!(url, "https://docs.example.com/v2/search/search_index.json");
        assert_eq!(payload.kind(), IndexKind::MkDocs);
    }

    #[tokio::test]
    async fn test_resolve_skips_invalid_bodies() {
        let fetcher = FakeFetcher::new()
            .with("https://docs.example.com/v2/searchindex.js", "<html>not found</html>")
            .with(
                "https://docs.example.com/searchindex.js",
                r#"Search.setIndex({"filenames":["a.html"],"titles":["A"],"terms":{"alpha":0}})"#,
            );

        let site = Url::parse("https://docs.example.com/v2/").unwrap();
        let (url, _) = resolve_index(&fetcher, &site, IndexKind::Sphinx).await.unwrap();
        assert_eq!(url, "https://docs.example.com/searchindex.js");
    }

    #[tokio::test]
    async fn test_fetch_index_gzip_and_empty() {
        let gz = gzip::compress(MKDOCS_BODY.as_bytes()).unwrap();
        let fetcher = FakeFetcher::new()
            .with("https://a.example.com/search/search_index.json", gz)
            .with("https://b.example.com/search/search_index.json", r#"{"docs":[]}"#);

        assert!(
            fetch_index(&fetcher, "https://a.example.com/search/search_index.json", IndexKind::MkDocs)
                .await
                .is_some()
        );
        assert!(
            fetch_index(&fetcher, "https://b.example.com/search/search_index.json", IndexKind::MkDocs)
                .await
                .is_none()
        );
    }
}
