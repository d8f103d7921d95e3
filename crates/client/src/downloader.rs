//! Prebuilt site index downloader.
//!
//! ### Candidates
//! - Tried strictly in order; the first usable response wins.
//! - 404 moves on to the next candidate, as does any transport failure or
//!   invalid body. Every skipped candidate is recorded with its reason.
//!
//! ### Conditional GET
//! - The `ETag` of the last download is kept next to the artifact in
//!   `<dest>.etag` and sent as `If-None-Match` while the artifact exists.
//! - 304 leaves the artifact bytes alone and only refreshes its mtime, which
//!   restarts the `max_age_hours` window.
//!
//! ### Writes
//! - Bodies are gunzipped (by magic bytes), validated against the artifact
//!   schema, and written atomically.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use docsite_core::artifact::{SiteIndexArtifact, write_atomic};
use docsite_core::config::DownloadSettings;
use docsite_core::{Error, gzip};

use crate::fetch::{Conditional, FetchClient};

/// Downloader outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// A new artifact was written.
    Downloaded,
    /// The server confirmed the local copy is current.
    NotModified,
    /// The local copy is fresh enough; nothing was requested.
    Ok,
    /// Auto-download is disabled and the local copy is missing or stale.
    Skipped,
    /// No candidate produced a usable artifact.
    Error,
}

/// A candidate URL that was passed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    pub status: DownloadStatus,
    pub path: PathBuf,
    /// Candidate that answered, for `downloaded` and `not_modified`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<DownloadFailure>,
}

impl DownloadReport {
    fn new(status: DownloadStatus, path: &Path) -> Self {
        Self { status, path: path.to_path_buf(), url: None, errors: Vec::new() }
    }
}

/// Fetches site index artifacts with conditional GET.
#[derive(Debug, Clone)]
pub struct IndexDownloader {
    client: FetchClient,
}

impl IndexDownloader {
    pub fn new(client: FetchClient) -> Self {
        Self { client }
    }

    /// Make sure `settings.path` holds a usable artifact.
    ///
    /// A local copy younger than `max_age_hours` is accepted without any
    /// network traffic.
    pub async fn ensure(&self, settings: &DownloadSettings) -> DownloadReport {
        let dest = settings.path.as_path();

        if let Some(age) = file_age(dest)
            && age <= settings.max_age()
        {
            tracing::debug!("site index {} is fresh ({}s old)", dest.display(), age.as_secs());
            return DownloadReport::new(DownloadStatus::Ok, dest);
        }
        if !settings.auto_download {
            tracing::info!("site index {} missing or stale and auto_download is off", dest.display());
            return DownloadReport::new(DownloadStatus::Skipped, dest);
        }
        if settings.urls.is_empty() {
            let mut report = DownloadReport::new(DownloadStatus::Error, dest);
            report.errors.push(DownloadFailure { url: String::new(), reason: "no download URLs configured".into() });
            return report;
        }

        self.download(&settings.urls, dest).await
    }

    /// Try each of `urls` in order until one yields an artifact.
    pub async fn download(&self, urls: &[String], dest: &Path) -> DownloadReport {
        let etag_path = etag_path(dest);
        let etag = if dest.exists() { read_etag(&etag_path) } else { None };
        let mut errors = Vec::new();

        for url in urls {
            match self.try_candidate(url, dest, &etag_path, etag.as_deref()).await {
                Ok(status) => {
                    tracing::info!(
                        url = %url,
                        path = %dest.display(),
                        status = ?status,
                        "site index download finished"
                    );
                    return DownloadReport { status, path: dest.to_path_buf(), url: Some(url.clone()), errors };
                }
                Err(reason) => {
                    tracing::debug!("site index candidate {} skipped: {}", url, reason);
                    errors.push(DownloadFailure { url: url.clone(), reason });
                }
            }
        }

        tracing::warn!("no site index candidate succeeded ({} tried)", urls.len());
        DownloadReport { status: DownloadStatus::Error, path: dest.to_path_buf(), url: None, errors }
    }

    async fn try_candidate(
        &self, url: &str, dest: &Path, etag_path: &Path, etag: Option<&str>,
    ) -> Result<DownloadStatus, String> {
        let response = self.client.get_conditional(url, etag).await.map_err(|e| e.to_string())?;

        match response {
            Conditional::NotModified => {
                if let Err(e) = touch(dest) {
                    tracing::warn!("failed to refresh mtime of {}: {}", dest.display(), e);
                }
                Ok(DownloadStatus::NotModified)
            }
            Conditional::NotFound => Err("HTTP 404".into()),
            Conditional::Fetched { bytes, etag } => {
                let body = gzip::maybe_decompress(&bytes, url, gzip::MAX_INFLATED_BYTES).map_err(|e| e.to_string())?;
                let artifact = SiteIndexArtifact::from_slice(&body).map_err(|e| e.to_string())?;
                write_atomic(dest, &body).map_err(|e| e.to_string())?;
                store_etag(etag_path, etag.as_deref());
                tracing::debug!(
                    "wrote {} ({} sitemaps, {} indexes)",
                    dest.display(),
                    artifact.sitemaps.len(),
                    artifact.indexes.len()
                );
                Ok(DownloadStatus::Downloaded)
            }
        }
    }
}

/// `<dest>.etag`
fn etag_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".etag");
    PathBuf::from(name)
}

fn read_etag(path: &Path) -> Option<String> {
    let value = std::fs::read_to_string(path).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn store_etag(path: &Path, etag: Option<&str>) {
    let result = match etag {
        Some(etag) => write_atomic(path, etag.as_bytes()),
        None => match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(Error::Io(e)),
            _ => Ok(()),
        },
    };
    if let Err(e) = result {
        tracing::warn!("failed to update {}: {}", path.display(), e);
    }
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO))
}

fn touch(path: &Path) -> std::io::Result<()> {
    File::options().write(true).open(path)?.set_modified(SystemTime::now())
}
