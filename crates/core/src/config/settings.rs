//! Builder and downloader settings.
//!
//! Both are nested sections of [`AppConfig`](super::AppConfig), so they load
//! from `[build]` / `[download]` TOML tables or `DOCSITE_BUILD__*` /
//! `DOCSITE_DOWNLOAD__*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which sites the builder crawls sitemaps for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SitemapMode {
    /// Only sites without a resolved MkDocs/Sphinx index.
    #[default]
    Missing,
    /// Every site.
    All,
    /// Never crawl sitemaps.
    Skip,
}

impl std::str::FromStr for SitemapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "missing" => Ok(Self::Missing),
            "all" => Ok(Self::All),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown sitemap mode: {other}")),
        }
    }
}

/// Settings for the offline index builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Sitemap crawl policy.
    #[serde(default)]
    pub sitemap_mode: SitemapMode,

    /// Size of the fixed worker pool.
    #[serde(default = "default_max_concurrent_sites")]
    pub max_concurrent_sites: usize,

    /// Write `output_path` gzip-compressed.
    #[serde(default)]
    pub gzip_output: bool,
}

fn default_max_concurrent_sites() -> usize {
    5
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            sitemap_mode: SitemapMode::Missing,
            max_concurrent_sites: default_max_concurrent_sites(),
            gzip_output: false,
        }
    }
}

/// Settings for the artifact downloader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Local destination of the artifact.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    /// Candidate URLs, tried in order.
    #[serde(default)]
    pub urls: Vec<String>,

    /// Whether `ensure` may hit the network at all.
    #[serde(default = "default_true")]
    pub auto_download: bool,

    /// A local copy younger than this is used as-is.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./docs_site_index.json")
}

fn default_true() -> bool {
    true
}

fn default_max_age_hours() -> u64 {
    24 * 7
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            urls: Vec::new(),
            auto_download: true,
            max_age_hours: default_max_age_hours(),
        }
    }
}

impl DownloadSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sitemap_mode_from_str() {
        assert_eq!("missing".parse::<SitemapMode>().unwrap(), SitemapMode::Missing);
        assert_eq!(" ALL ".parse::<SitemapMode>().unwrap(), SitemapMode::All);
        assert_eq!("skip".parse::<SitemapMode>().unwrap(), SitemapMode::Skip);
        assert!("sometimes".parse::<SitemapMode>().is_err());
    }

    #[test]
    fn test_sitemap_mode_serde() {
        let json = serde_json::to_string(&SitemapMode::All).unwrap();
        assert_eq!(json, "\"all\"");
        let mode: SitemapMode = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(mode, SitemapMode::Skip);
    }

    #[test]
    fn test_download_max_age() {
        let settings = DownloadSettings { max_age_hours: 2, ..Default::default() };
        assert_eq!(settings.max_age(), Duration::from_secs(7200));
    }
}
