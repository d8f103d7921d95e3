//! Cache entry types.
//!
//! Entries are immutable once built and shared behind `Arc`; a refresh builds
//! a new entry and swaps it in whole.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::index::{IndexKind, IndexPayload};

/// Page URLs discovered for one origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapCacheEntry {
    pub fetched_at: DateTime<Utc>,
    /// Absolute, deduplicated, in discovery order.
    pub urls: Vec<String>,
}

impl SitemapCacheEntry {
    /// Build an entry stamped now, dropping duplicate URLs.
    pub fn new(urls: Vec<String>) -> Self {
        Self::at(Utc::now(), urls)
    }

    pub fn at(fetched_at: DateTime<Utc>, urls: Vec<String>) -> Self {
        let mut seen = HashSet::with_capacity(urls.len());
        let urls = urls.into_iter().filter(|u| seen.insert(u.clone())).collect();
        Self { fetched_at, urls }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        is_fresh(self.fetched_at, ttl)
    }
}

/// Result of resolving one search-index URL.
#[derive(Debug, Clone)]
pub struct IndexCacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub kind: IndexKind,
    /// `None` records that the URL held no usable index; such entries live
    /// in memory only and are never persisted.
    pub payload: Option<Arc<IndexPayload>>,
}

impl IndexCacheEntry {
    pub fn new(kind: IndexKind, payload: Option<IndexPayload>) -> Self {
        Self { fetched_at: Utc::now(), kind, payload: payload.map(Arc::new) }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        is_fresh(self.fetched_at, ttl)
    }
}

fn is_fresh(fetched_at: DateTime<Utc>, ttl: Duration) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => Utc::now().signed_duration_since(fetched_at) <= ttl,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sitemap_entry_dedupes_in_order() {
        let entry = SitemapCacheEntry::new(vec![
            "https://a.example.com/x".into(),
            "https://a.example.com/y".into(),
            "https://a.example.com/x".into(),
        ]);
        assert_eq!(entry.urls, vec!["https://a.example.com/x", "https://a.example.com/y"]);
    }

    #[test]
    fn test_freshness() {
        let ttl = Duration::from_secs(3600);
        let entry = SitemapCacheEntry::new(Vec::new());
        assert!(entry.is_fresh(ttl));

        let old = SitemapCacheEntry::at(Utc::now() - chrono::Duration::hours(2), Vec::new());
        assert!(!old.is_fresh(ttl));
    }

    #[test]
    fn test_index_entry_negative() {
        let entry = IndexCacheEntry::new(IndexKind::Sphinx, None);
        assert!(entry.payload.is_none());
        assert!(entry.is_fresh(Duration::from_secs(60)));
    }
}
