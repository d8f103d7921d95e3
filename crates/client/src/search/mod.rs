//! Site-scoped documentation search.
//!
//! A query names a site with a leading `site:<url>` directive followed by
//! free-text terms. Three strategies are tried in order until one produces a
//! match:
//!
//! 1. The site's MkDocs search index.
//! 2. The site's Sphinx search index.
//! 3. Path ranking over the site's sitemap (or fallback links).
//!
//! ### Offline mode
//! With network disabled the strategies are handed no fetcher at all, so
//! they can only read what the [`CacheStore`] already holds.

pub mod query;
pub mod rank;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use docsite_core::cache::CacheStore;
use docsite_core::config::AppConfig;
use docsite_core::index::{IndexKind, IndexPayload, MkDocsRecord, SphinxIndex};

use crate::discover::{SitemapDiscoverer, fetch_index};
use crate::extract::{LivePageText, PageTextSource, excerpt, fetch_page_meta, strip_tags};
use crate::fetch::Fetcher;

pub use query::{SiteQuery, tokenize};
pub use rank::SphinxMatch;

/// Per-call search options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum results returned (default: 5).
    pub num_results: usize,
    /// Permit network access; the engine's own setting can still veto it.
    pub allow_network: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { num_results: 5, allow_network: true }
    }
}

/// A candidate page for the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedResult {
    pub link: String,
    pub title: String,
    pub snippet: String,
    pub score: usize,
}

/// Search output; an unsatisfiable query yields an empty `organic` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub organic: Vec<RankedResult>,
}

/// Engine settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub allow_network: bool,
    pub allow_html_fallback: bool,
    pub sitemap_ttl: Duration,
    pub index_ttl: Duration,
    pub max_sitemap_urls: usize,
    pub sphinx_match: SphinxMatch,
}

impl From<&AppConfig> for SearchSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            allow_network: config.allow_network,
            allow_html_fallback: config.allow_html_fallback,
            sitemap_ttl: config.sitemap_ttl(),
            index_ttl: config.index_ttl(),
            max_sitemap_urls: config.max_sitemap_urls,
            sphinx_match: SphinxMatch::default(),
        }
    }
}

/// Query engine over a shared discovery cache.
pub struct SiteSearch {
    cache: Arc<CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    page_text: Arc<dyn PageTextSource>,
    settings: SearchSettings,
}

impl SiteSearch {
    pub fn new(cache: Arc<CacheStore>, fetcher: Arc<dyn Fetcher>, settings: SearchSettings) -> Self {
        let page_text = Arc::new(LivePageText::new(fetcher.clone()));
        Self { cache, fetcher, page_text, settings }
    }

    /// Replace the page-text source used for Sphinx snippets.
    pub fn with_page_text(mut self, source: Arc<dyn PageTextSource>) -> Self {
        self.page_text = source;
        self
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Answer a `site:` query. Never fails; "no results" is an empty list.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> SearchResponse {
        let Some(query) = SiteQuery::parse(query) else {
            tracing::debug!("query has no site: directive");
            return SearchResponse::default();
        };
        if options.num_results == 0 {
            return SearchResponse::default();
        }

        let fetcher = (options.allow_network && self.settings.allow_network).then(|| self.fetcher.clone());
        let limit = options.num_results;

        let mut organic = self.mkdocs_results(&query, fetcher.as_ref(), limit).await;
        if organic.is_empty() {
            organic = self.sphinx_results(&query, fetcher.as_ref(), limit).await;
        }
        if organic.is_empty() {
            organic = self.sitemap_results(&query, fetcher.as_ref(), limit).await;
        }

        organic.truncate(limit);
        tracing::debug!(
            site = %query.site_url,
            tokens = query.tokens.len(),
            results = organic.len(),
            "search complete"
        );
        SearchResponse { organic }
    }

    /// First index of `kind` found for the query's site, in priority order.
    ///
    /// Without a fetcher only cached entries (of any age) are consulted.
    async fn resolve_index(
        &self, query: &SiteQuery, kind: IndexKind, fetcher: Option<&Arc<dyn Fetcher>>,
    ) -> Option<(String, Arc<IndexPayload>)> {
        let candidates = kind.candidates(&query.site_url);

        let Some(fetcher) = fetcher else {
            for candidate in candidates {
                if let Some(payload) = self.cache.cached_index(&candidate, kind).await {
                    return Some((candidate, payload));
                }
            }
            return None;
        };

        let ttl = self.settings.index_ttl;
        let lookups = candidates.iter().map(|candidate| {
            let fetcher = fetcher.clone();
            let url = candidate.clone();
            self.cache.index_or_populate(candidate, kind, ttl, move || async move {
                fetch_index(fetcher.as_ref(), &url, kind).await
            })
        });
        let payloads = join_all(lookups).await;

        candidates
            .into_iter()
            .zip(payloads)
            .find_map(|(url, payload)| payload.map(|payload| (url, payload)))
    }

    async fn mkdocs_results(
        &self, query: &SiteQuery, fetcher: Option<&Arc<dyn Fetcher>>, limit: usize,
    ) -> Vec<RankedResult> {
        let Some((index_url, payload)) = self.resolve_index(query, IndexKind::MkDocs, fetcher).await else {
            return Vec::new();
        };
        let IndexPayload::MkDocs(records) = payload.as_ref() else {
            return Vec::new();
        };
        let Ok(base) = Url::parse(&IndexKind::MkDocs.base_from_index_url(&index_url)) else {
            return Vec::new();
        };

        let ranked = rank::rank(records.iter().map(|record| (record, rank::score_mkdocs(record, &query.tokens))));
        collect_results(query, &base, ranked, limit, |record: &MkDocsRecord| {
            (record.location.clone(), record.title.clone(), excerpt(&strip_tags(&record.text), &query.tokens))
        })
    }

    async fn sphinx_results(
        &self, query: &SiteQuery, fetcher: Option<&Arc<dyn Fetcher>>, limit: usize,
    ) -> Vec<RankedResult> {
        let Some((index_url, payload)) = self.resolve_index(query, IndexKind::Sphinx, fetcher).await else {
            return Vec::new();
        };
        let IndexPayload::Sphinx(index) = payload.as_ref() else {
            return Vec::new();
        };
        let Ok(base) = Url::parse(&IndexKind::Sphinx.base_from_index_url(&index_url)) else {
            return Vec::new();
        };

        let ranked = rank::rank(rank::score_sphinx(index, &query.tokens, self.settings.sphinx_match));
        let mut results = collect_results(query, &base, ranked, limit, |doc: usize| sphinx_document(index, doc));

        // Snippets need the page body, which is network-only.
        if fetcher.is_some() {
            let texts = join_all(results.iter().map(|result| self.page_text.page_text(&result.link))).await;
            for (result, text) in results.iter_mut().zip(texts) {
                if let Some(text) = text {
                    result.snippet = excerpt(&text, &query.tokens);
                }
            }
        }
        results
    }

    async fn sitemap_results(
        &self, query: &SiteQuery, fetcher: Option<&Arc<dyn Fetcher>>, limit: usize,
    ) -> Vec<RankedResult> {
        let origin = query.origin.to_string();
        let entry = match fetcher {
            Some(fetcher) => {
                let discoverer = SitemapDiscoverer::new(fetcher.clone(), self.settings.max_sitemap_urls);
                let site_url = query.site_url.clone();
                let allow_html_fallback = self.settings.allow_html_fallback;
                Some(
                    self.cache
                        .sitemap_or_populate(&origin, self.settings.sitemap_ttl, move || async move {
                            discoverer.load_site_urls(&site_url, allow_html_fallback).await
                        })
                        .await,
                )
            }
            None => self.cache.cached_sitemap(&origin).await,
        };
        let Some(entry) = entry else {
            return Vec::new();
        };

        let candidates = entry.urls.iter().filter_map(|link| {
            let url = Url::parse(link).ok()?;
            let relative = query.relative_path(&url)?;
            let score = rank::score_path(relative, &query.tokens);
            Some(((link, url.path().to_string()), score))
        });

        let mut seen = HashSet::new();
        let mut results: Vec<RankedResult> = rank::rank(candidates)
            .into_iter()
            .filter(|((link, _), _)| seen.insert(*link))
            .take(limit)
            .map(|((link, path), score)| RankedResult {
                link: link.clone(),
                title: rank::title_from_path(&path),
                snippet: String::new(),
                score,
            })
            .collect();

        if let Some(fetcher) = fetcher {
            let metas = join_all(
                results
                    .iter()
                    .map(|result| fetch_page_meta(fetcher.as_ref(), &result.link, &query.tokens)),
            )
            .await;
            for (result, meta) in results.iter_mut().zip(metas) {
                if let Some(meta) = meta {
                    if let Some(title) = meta.title {
                        result.title = title;
                    }
                    result.snippet = meta.snippet;
                }
            }
        }
        results
    }
}

fn sphinx_document(index: &SphinxIndex, doc: usize) -> (String, String, String) {
    let path = index.page_path(doc).unwrap_or_default();
    let title = index.titles.get(doc).cloned().unwrap_or_default();
    (path, title, String::new())
}

/// Resolve ranked documents to links under the query prefix, deduplicated,
/// keeping at most `limit`.
fn collect_results<T>(
    query: &SiteQuery,
    base: &Url,
    ranked: Vec<(T, usize)>,
    limit: usize,
    describe: impl Fn(T) -> (String, String, String),
) -> Vec<RankedResult> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for (doc, score) in ranked {
        if results.len() >= limit {
            break;
        }
        let (location, title, snippet) = describe(doc);
        let Ok(url) = base.join(&location) else {
            continue;
        };
        if !query.contains(&url) || !seen.insert(url.to_string()) {
            continue;
        }
        results.push(RankedResult { link: url.into(), title, snippet, score });
    }
    results
}
