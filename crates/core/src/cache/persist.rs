//! Cache snapshots.
//!
//! A snapshot is a [`SiteIndexArtifact`], so a file written by
//! [`CacheStore::save`], by the offline builder, or fetched by the downloader
//! all load the same way. Sitemap entries keep their own `fetched_at`; index
//! entries take the artifact's `generated_at`.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use super::{CacheStore, IndexCacheEntry, SitemapCacheEntry};
use crate::Error;
use crate::artifact::{SiteIndexArtifact, SitemapRecord};

/// Entry counts restored from an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadStats {
    pub sitemaps: usize,
    pub indexes: usize,
}

impl CacheStore {
    /// Export both caches; negative index entries are left out.
    pub async fn to_artifact(&self) -> SiteIndexArtifact {
        let mut artifact = SiteIndexArtifact::new();

        for (origin, entry) in self.sitemaps.entries().await {
            artifact
                .sitemaps
                .insert(origin, SitemapRecord { urls: entry.urls.clone(), fetched_at: Some(entry.fetched_at) });
        }
        for (index_url, entry) in self.indexes.entries().await {
            if let Some(payload) = &entry.payload {
                artifact.indexes.insert(index_url, payload.as_ref().clone());
            }
        }

        artifact
    }

    /// Replace matching entries with those from `artifact`.
    pub async fn load_artifact(&self, artifact: &SiteIndexArtifact) -> LoadStats {
        let generated_at = artifact.generated_at_utc().unwrap_or_else(Utc::now);

        for (origin, record) in &artifact.sitemaps {
            let fetched_at = record.fetched_at.unwrap_or(generated_at);
            self.put_sitemap(origin.clone(), SitemapCacheEntry::at(fetched_at, record.urls.clone()))
                .await;
        }
        let mut indexes = 0;
        for (index_url, payload) in &artifact.indexes {
            let payload = match payload.clone().validated() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("skipping index {}: {}", index_url, e);
                    continue;
                }
            };
            let entry = IndexCacheEntry {
                fetched_at: generated_at,
                kind: payload.kind(),
                payload: Some(Arc::new(payload)),
            };
            self.put_index(index_url.clone(), entry).await;
            indexes += 1;
        }

        let stats = LoadStats { sitemaps: artifact.sitemaps.len(), indexes };
        tracing::debug!(sitemaps = stats.sitemaps, indexes = stats.indexes, "loaded site index artifact into cache");
        stats
    }

    /// Write both caches to `path`, gzip-compressed when it ends in `.gz`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let gzip_output = path.extension().is_some_and(|ext| ext == "gz");
        let artifact = self.to_artifact().await;
        artifact.write(path, gzip_output)?;
        tracing::info!(
            path = %path.display(),
            sitemaps = artifact.sitemaps.len(),
            indexes = artifact.indexes.len(),
            "saved cache snapshot"
        );
        Ok(())
    }

    /// Restore both caches from `path`.
    ///
    /// Returns `false` (and leaves the cache untouched) when the file is
    /// missing, corrupt, or carries an unsupported schema version.
    pub async fn load(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match SiteIndexArtifact::read(path) {
            Ok(artifact) => {
                self.load_artifact(&artifact).await;
                true
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no cache snapshot at {}", path.display());
                false
            }
            Err(e) => {
                tracing::warn!("ignoring cache snapshot {}: {}", path.display(), e);
                false
            }
        }
    }
}
