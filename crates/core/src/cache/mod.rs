//! In-memory cache for sitemap and search-index discovery.
//!
//! This module provides a single-process cache, constructed once and shared
//! via `Arc`, that supports:
//!
//! - Sitemap entries keyed by site origin
//! - Parsed search-index entries keyed by resolved index URL
//! - TTL-bound freshness, with stale entries replaced wholesale
//! - Per-key coalescing: concurrent misses on one key perform one fetch
//! - JSON snapshots in the site index artifact format

mod coalesce;
pub mod entry;
pub mod persist;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::index::{IndexKind, IndexPayload};

use coalesce::Coalescing;

pub use entry::{IndexCacheEntry, SitemapCacheEntry};

/// Process-wide discovery cache.
///
/// The query engine reads through it; the builder and downloader never touch
/// it and only exchange data with it through artifact files.
pub struct CacheStore {
    sitemaps: Coalescing<Arc<SitemapCacheEntry>>,
    indexes: Coalescing<Arc<IndexCacheEntry>>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        Self { sitemaps: Coalescing::new(), indexes: Coalescing::new() }
    }

    /// Sitemap entry for `origin` regardless of age. Never fetches.
    pub async fn cached_sitemap(&self, origin: &str) -> Option<Arc<SitemapCacheEntry>> {
        self.sitemaps.get(origin).await
    }

    /// Fresh sitemap entry for `origin`, running `populate` on a miss.
    ///
    /// Concurrent callers for the same origin share one `populate` run and
    /// all observe the same entry.
    pub async fn sitemap_or_populate<F, Fut>(&self, origin: &str, ttl: Duration, populate: F) -> Arc<SitemapCacheEntry>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Vec<String>> + Send + 'static,
    {
        self.sitemaps
            .get_or_populate(
                origin,
                move |entry| entry.is_fresh(ttl),
                move || {
                    let urls = populate();
                    async move { Arc::new(SitemapCacheEntry::new(urls.await)) }
                },
            )
            .await
    }

    pub async fn put_sitemap(&self, origin: impl Into<String>, entry: SitemapCacheEntry) {
        self.sitemaps.insert(origin.into(), Arc::new(entry)).await;
    }

    /// Parsed index at `index_url` regardless of age. Never fetches.
    ///
    /// Negative entries and entries of another kind read as `None`.
    pub async fn cached_index(&self, index_url: &str, kind: IndexKind) -> Option<Arc<IndexPayload>> {
        self.indexes
            .get(index_url)
            .await
            .filter(|entry| entry.kind == kind)
            .and_then(|entry| entry.payload.clone())
    }

    /// Fresh index entry for `index_url`, running `populate` on a miss.
    ///
    /// A `None` from `populate` is cached too, so a site without an index is
    /// not fetched again until the TTL lapses.
    pub async fn index_or_populate<F, Fut>(
        &self, index_url: &str, kind: IndexKind, ttl: Duration, populate: F,
    ) -> Option<Arc<IndexPayload>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Option<IndexPayload>> + Send + 'static,
    {
        let entry = self
            .indexes
            .get_or_populate(
                index_url,
                move |entry| entry.kind == kind && entry.is_fresh(ttl),
                move || {
                    let payload = populate();
                    async move { Arc::new(IndexCacheEntry::new(kind, payload.await)) }
                },
            )
            .await;
        entry.payload.clone().filter(|payload| payload.kind() == kind)
    }

    pub async fn put_index(&self, index_url: impl Into<String>, entry: IndexCacheEntry) {
        self.indexes.insert(index_url.into(), Arc::new(entry)).await;
    }

    pub async fn sitemap_count(&self) -> usize {
        self.sitemaps.len().await
    }

    pub async fn index_count(&self) -> usize {
        self.indexes.len().await
    }
}
