//! Page and index discovery for a documentation site.
//!
//! ### Sitemaps
//! - `robots.txt` `Sitemap:` lines first, then the conventional
//!   `/sitemap.xml` when robots lists none.
//! - `<sitemapindex>` documents expand recursively (depth 3, each sitemap
//!   fetched once), gzip bodies are decompressed by magic bytes.
//! - The flat result is deduplicated and capped.
//!
//! ### HTML fallback
//! - With no sitemap URLs, same-origin `<a href>` targets of the site page.
//!
//! ### Search indexes
//! - See [`index`].

pub mod index;
pub mod robots;
pub mod sitemap;

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use url::Url;

use docsite_core::gzip;

use crate::extract::same_origin_links;
use crate::fetch::{Fetcher, SiteOrigin};

pub use index::{fetch_index, resolve_index};
pub use sitemap::SitemapDocument;

/// Nested `<sitemapindex>` levels followed below the root sitemaps.
const MAX_SITEMAP_DEPTH: usize = 3;

/// Sitemaps fetched at once within one nesting level.
const SITEMAP_FETCH_CONCURRENCY: usize = 4;

/// Robots/sitemap discoverer bound to one fetcher.
#[derive(Clone)]
pub struct SitemapDiscoverer {
    fetcher: Arc<dyn Fetcher>,
    max_urls: usize,
}

impl SitemapDiscoverer {
    pub fn new(fetcher: Arc<dyn Fetcher>, max_urls: usize) -> Self {
        Self { fetcher, max_urls: max_urls.max(1) }
    }

    /// Sitemap URLs listed in `origin/robots.txt`.
    ///
    /// A missing or malformed file yields an empty list.
    pub async fn discover_sitemaps(&self, origin: &SiteOrigin) -> Vec<String> {
        let Some(robots_url) = origin.join("/robots.txt") else {
            return Vec::new();
        };
        let Some(body) = self.fetcher.fetch_bytes(robots_url.as_str()).await else {
            return Vec::new();
        };
        robots::sitemap_urls(&String::from_utf8_lossy(&body), &robots_url)
    }

    /// Every page URL discoverable for the site at `site_url`.
    ///
    /// An empty result is normal and meant to be cached like any other.
    pub async fn load_site_urls(&self, site_url: &Url, allow_html_fallback: bool) -> Vec<String> {
        let Some(origin) = SiteOrigin::of(site_url) else {
            return Vec::new();
        };

        let mut roots = self.discover_sitemaps(&origin).await;
        if roots.is_empty()
            && let Some(conventional) = origin.join("/sitemap.xml")
        {
            roots.push(conventional.to_string());
        }

        let urls = self.crawl_sitemaps(roots).await;
        if !urls.is_empty() || !allow_html_fallback {
            tracing::debug!("{} sitemap URLs for {}", urls.len(), origin);
            return urls;
        }

        let urls = self.html_links(site_url).await;
        tracing::debug!("{} fallback links for {}", urls.len(), origin);
        urls
    }

    /// Expand `roots` breadth-first into a flat, deduplicated page list.
    pub async fn crawl_sitemaps(&self, roots: Vec<String>) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut urls = Vec::new();
        let mut level = roots;

        for depth in 0..=MAX_SITEMAP_DEPTH {
            level.retain(|url| visited.insert(url.clone()));
            if level.is_empty() {
                break;
            }

            let documents: Vec<Option<SitemapDocument>> = stream::iter(level.clone())
                .map(|url| {
                    let this = self.clone();
                    async move { this.fetch_sitemap(&url).await }
                })
                .buffered(SITEMAP_FETCH_CONCURRENCY)
                .collect()
                .await;

            let mut next = Vec::new();
            for document in documents.into_iter().flatten() {
                match document {
                    SitemapDocument::UrlSet(locs) => {
                        for loc in locs {
                            if urls.len() >= self.max_urls {
                                tracing::debug!("sitemap crawl capped at {} URLs", self.max_urls);
                                return urls;
                            }
                            if seen.insert(loc.clone()) {
                                urls.push(loc);
                            }
                        }
                    }
                    SitemapDocument::Index(children) if depth < MAX_SITEMAP_DEPTH => next.extend(children),
                    SitemapDocument::Index(children) => {
                        tracing::debug!("dropping {} sitemaps nested deeper than {}", children.len(), MAX_SITEMAP_DEPTH)
                    }
                }
            }
            level = next;
        }

        urls
    }

    async fn fetch_sitemap(&self, url: &str) -> Option<SitemapDocument> {
        let bytes = self.fetcher.fetch_bytes(url).await?;
        match gzip::maybe_decompress(&bytes, url, gzip::MAX_INFLATED_BYTES) {
            Ok(body) => Some(sitemap::parse(&body)),
            Err(e) => {
                tracing::warn!("ignoring sitemap {}: {}", url, e);
                None
            }
        }
    }

    async fn html_links(&self, site_url: &Url) -> Vec<String> {
        let Some(body) = self.fetcher.fetch_bytes(site_url.as_str()).await else {
            return Vec::new();
        };
        let mut links = same_origin_links(&String::from_utf8_lossy(&body), site_url);
        links.truncate(self.max_urls);
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFetcher;

    fn urlset(locs: &[&str]) -> String {
        let entries: String = locs.iter().map(|loc| format!("<url><loc>{loc}</loc></url>")).collect();
        format!(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#)
    }

    fn sitemap_index(locs: &[&str]) -> String {
        let entries: String = locs.iter().map(|loc| format!("<sitemap><loc>{loc}</loc></sitemap>")).collect();
        format!(r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</sitemapindex>"#)
    }

    fn site() -> Url {
        Url::parse("https://docs.example.com/guide/").unwrap()
    }

    #[tokio::test]
    async fn test_robots_sitemap_and_nested_index() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with("https://docs.example.com/robots.txt", "Sitemap: /sitemap_index.xml\n")
                .with(
                    "https://docs.example.com/sitemap_index.xml",
                    sitemap_index(&["https://docs.example.com/a.xml", "https://docs.example.com/b.xml.gz"]),
                )
                .with(
                    "https://docs.example.com/a.xml",
                    urlset(&["https://docs.example.com/one/", "https://docs.example.com/two/"]),
                )
                .with(
                    "https://docs.example.com/b.xml.gz",
                    gzip::compress(
                        urlset(&["https://docs.example.com/two/", "https://docs.example.com/three/"]).as_bytes(),
                    )
                    .unwrap(),
                ),
        );

        let discoverer = SitemapDiscoverer::new(fetcher.clone(), 100);
        let urls = discoverer.load_site_urls(&site(), true).await;
        assert_eq!(
            urls,
            vec!["https://docs.example.com/one/", "https://docs.example.com/two/", "https://docs.example.com/three/"]
        );
        assert_eq!(fetcher.count("https://docs.example.com/sitemap.xml"), 0);
        assert_eq!(fetcher.count("https://docs.example.com/guide/"), 0);
    }

    #[tokio::test]
    async fn test_conventional_sitemap_when_robots_missing() {
        let fetcher = Arc::new(
            FakeFetcher::new().with("https://docs.example.com/sitemap.xml", urlset(&["https://docs.example.com/x/"])),
        );
        let urls = SitemapDiscoverer::new(fetcher, 100).load_site_urls(&site(), true).await;
        assert_eq!(urls, vec!["https://docs.example.com/x/"]);
    }

    #[tokio::test]
    async fn test_html_fallback_same_origin() {
        let page = r##"<html><body>
            <a href="/guide/install/">Install</a>
            <a href="usage/#top">Usage</a>
            <a href="https://elsewhere.example.com/">Elsewhere</a>
            <a href="mailto:docs@example.com">Mail</a>
        </body></html>"##;
        let fetcher = Arc::new(FakeFetcher::new().with("https://docs.example.com/guide/", page));

        let discoverer = SitemapDiscoverer::new(fetcher, 100);
        assert_eq!(
            discoverer.load_site_urls(&site(), true).await,
            vec!["https://docs.example.com/guide/install/", "https://docs.example.com/guide/usage/"]
        );
        assert!(discoverer.load_site_urls(&site(), false).await.is_empty());
    }

    #[tokio::test]
    async fn test_cyclic_index_and_cap() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with("https://docs.example.com/robots.txt", "Sitemap: https://docs.example.com/loop.xml")
                .with(
                    "https://docs.example.com/loop.xml",
                    sitemap_index(&["https://docs.example.com/loop.xml", "https://docs.example.com/pages.xml"]),
                )
                .with(
                    "https://docs.example.com/pages.xml",
                    urlset(&["https://docs.example.com/1", "https://docs.example.com/2", "https://docs.example.com/3"]),
                ),
        );

        let urls = SitemapDiscoverer::new(fetcher.clone(), 2).load_site_urls(&site(), false).await;
        assert_eq!(urls, vec!["https://docs.example.com/1", "https://docs.example.com/2"]);
        assert_eq!(fetcher.count("https://docs.example.com/loop.xml"), 1);
    }

    #[tokio::test]
    async fn test_crawl_runs_on_spawned_task() {
        let fetcher = Arc::new(
            FakeFetcher::new().with("https://docs.example.com/sitemap.xml", urlset(&["https://docs.example.com/x/"])),
        );
        let discoverer = SitemapDiscoverer::new(fetcher, 100);

        let urls = tokio::spawn(async move { discoverer.load_site_urls(&site(), false).await }).await.unwrap();
        assert_eq!(urls, vec!["https://docs.example.com/x/"]);
    }

    #[tokio::test]
    async fn test_depth_cap() {
        let mut fetcher = FakeFetcher::new().with("https://docs.example.com/robots.txt", "Sitemap: /s0.xml");
        for depth in 0..5 {
            let child = format!("https://docs.example.com/s{}.xml", depth + 1);
            fetcher = fetcher.with(&format!("https://docs.example.com/s{depth}.xml"), sitemap_index(&[child.as_str()]));
        }
        let fetcher = Arc::new(fetcher);

        let urls = SitemapDiscoverer::new(fetcher.clone(), 100).load_site_urls(&site(), false).await;
        assert!(urls.is_empty());
        assert_eq!(fetcher.count("https://docs.example.com/s3.xml"), 1);
        assert_eq!(fetcher.count("https://docs.example.com/s4.xml"), 0);
    }
}
