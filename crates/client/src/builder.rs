//! Offline site index builder.
//!
//! Resolves the search index and (per [`SitemapMode`]) the sitemap of every
//! site in a catalog, then writes them all as one [`SiteIndexArtifact`].
//! Sites are processed by a fixed-size pool: a permit is taken before each
//! task is spawned, so at most `max_concurrent_sites` crawls run at once.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use docsite_core::artifact::{SiteIndexArtifact, SitemapRecord};
use docsite_core::config::{AppConfig, BuildSettings, SitemapMode};
use docsite_core::index::{IndexKind, IndexPayload};
use docsite_core::Error;

use crate::discover::{SitemapDiscoverer, resolve_index};
use crate::fetch::{Fetcher, SiteOrigin, canonicalize};

/// Overall build outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    /// At least one site was indexed and the artifact was written.
    Ok,
    /// No site produced an index or sitemap; nothing was written.
    Error,
}

/// A site that produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFailure {
    pub library: String,
    pub url: String,
    pub reason: String,
}

/// Summary of one build run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub status: BuildStatus,
    pub indexed_libraries: usize,
    pub total_libraries: usize,
    pub output_path: PathBuf,
    pub index_count: usize,
    pub sitemap_count: usize,
    pub failures: Vec<BuildFailure>,
}

/// What one site contributed.
#[derive(Debug, Default)]
struct SiteOutcome {
    index: Option<(String, IndexPayload)>,
    sitemap: Option<(String, Vec<String>)>,
}

impl SiteOutcome {
    fn is_indexed(&self) -> bool {
        self.index.is_some() || self.sitemap.as_ref().is_some_and(|(_, urls)| !urls.is_empty())
    }
}

/// Builds site index artifacts from a library → URL catalog.
#[derive(Clone)]
pub struct IndexBuilder {
    fetcher: Arc<dyn Fetcher>,
    settings: BuildSettings,
    max_sitemap_urls: usize,
    allow_html_fallback: bool,
}

impl IndexBuilder {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &AppConfig) -> Self {
        Self {
            fetcher,
            settings: config.build.clone(),
            max_sitemap_urls: config.max_sitemap_urls,
            allow_html_fallback: config.allow_html_fallback,
        }
    }

    pub fn with_sitemap_mode(mut self, mode: SitemapMode) -> Self {
        self.settings.sitemap_mode = mode;
        self
    }

    pub fn with_gzip_output(mut self, gzip_output: bool) -> Self {
        self.settings.gzip_output = gzip_output;
        self
    }

    /// Crawl every site in `sites` and write the artifact to `output_path`,
    /// gzip-compressed when `gzip_output` is set.
    ///
    /// Per-site problems are recorded in the report; only an empty catalog
    /// or a failed write is an error.
    pub async fn build(&self, sites: &BTreeMap<String, String>, output_path: &Path) -> Result<BuildReport, Error> {
        if sites.is_empty() {
            return Err(Error::InvalidInput("sites cannot be empty".into()));
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_sites.max(1)));
        let mut join_set = JoinSet::new();
        let mut spawned = HashMap::new();

        for (library, url) in sites {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::InvalidInput(format!("worker pool closed: {e}")))?;
            let builder = self.clone();
            let library = library.clone();
            let url = url.clone();

            let task = (library.clone(), url.clone());
            let handle = join_set.spawn(async move {
                let _permit = permit;
                let outcome = builder.index_site(&url).await;
                (library, url, outcome)
            });
            spawned.insert(handle.id(), task);
        }

        let mut artifact = SiteIndexArtifact::new();
        let mut failures = Vec::new();
        let mut indexed_libraries = 0;

        while let Some(joined) = join_set.join_next_with_id().await {
            let (library, url, outcome) = match joined {
                Ok((_, done)) => done,
                Err(e) => {
                    let (library, url) = spawned.remove(&e.id()).unwrap_or_default();
                    tracing::warn!("site task for {} failed: {}", library, e);
                    failures.push(BuildFailure { library, url, reason: format!("site task failed: {e}") });
                    continue;
                }
            };

            match outcome {
                Ok(outcome) if outcome.is_indexed() => {
                    indexed_libraries += 1;
                    if let Some((index_url, payload)) = outcome.index {
                        artifact.indexes.insert(index_url, payload);
                    }
                    if let Some((origin, urls)) = outcome.sitemap.filter(|(_, urls)| !urls.is_empty()) {
                        artifact.sitemaps.insert(origin, SitemapRecord { urls, fetched_at: Some(Utc::now()) });
                    }
                }
                Ok(_) => {
                    let reason = "no search index or sitemap found".to_string();
                    failures.push(BuildFailure { library, url, reason });
                }
                Err(e) => failures.push(BuildFailure { library, url, reason: e.to_string() }),
            }
        }
        failures.sort_by(|a, b| a.library.cmp(&b.library));

        let status = if indexed_libraries > 0 { BuildStatus::Ok } else { BuildStatus::Error };
        if status == BuildStatus::Ok {
            artifact.write(output_path, self.settings.gzip_output)?;
        }

        let report = BuildReport {
            status,
            indexed_libraries,
            total_libraries: sites.len(),
            output_path: output_path.to_path_buf(),
            index_count: artifact.indexes.len(),
            sitemap_count: artifact.sitemaps.len(),
            failures,
        };
        tracing::info!(
            status = ?report.status,
            indexed = report.indexed_libraries,
            total = report.total_libraries,
            indexes = report.index_count,
            sitemaps = report.sitemap_count,
            "site index build finished"
        );
        Ok(report)
    }

    async fn index_site(&self, url: &str) -> Result<SiteOutcome, Error> {
        let site_url: Url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let origin = SiteOrigin::of(&site_url).ok_or_else(|| Error::InvalidUrl(format!("{url}: no host")))?;

        let mut outcome = SiteOutcome::default();
        for kind in [IndexKind::MkDocs, IndexKind::Sphinx] {
            if let Some(found) = resolve_index(self.fetcher.as_ref(), &site_url, kind).await {
                tracing::debug!("{} index for {} at {}", kind, site_url, found.0);
                outcome.index = Some(found);
                break;
            }
        }

        let crawl = match self.settings.sitemap_mode {
            SitemapMode::All => true,
            SitemapMode::Missing => outcome.index.is_none(),
            SitemapMode::Skip => false,
        };
        if crawl {
            let discoverer = SitemapDiscoverer::new(self.fetcher.clone(), self.max_sitemap_urls);
            let urls = discoverer.load_site_urls(&site_url, self.allow_html_fallback).await;
            outcome.sitemap = Some((origin.to_string(), urls));
        }

        Ok(outcome)
    }
}
