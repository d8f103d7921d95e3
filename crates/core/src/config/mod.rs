//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DOCSITE_*)
//! 2. TOML config file (if DOCSITE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod settings;
mod validation;

pub use settings::{BuildSettings, DownloadSettings, SitemapMode};
pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DOCSITE_*, nested sections split on `__`)
/// 2. TOML config file (if DOCSITE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// User-Agent string for HTTP requests.
    ///
    /// Set via DOCSITE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in milliseconds.
    ///
    /// Set via DOCSITE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via DOCSITE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Sitemap cache entries older than this are refreshed.
    ///
    /// Set via DOCSITE_SITEMAP_TTL_HOURS environment variable.
    #[serde(default = "default_ttl_hours")]
    pub sitemap_ttl_hours: u64,

    /// Search-index cache entries older than this are refreshed.
    ///
    /// Set via DOCSITE_INDEX_TTL_HOURS environment variable.
    #[serde(default = "default_ttl_hours")]
    pub index_ttl_hours: u64,

    /// When false, queries are answered from cache only.
    ///
    /// Set via DOCSITE_ALLOW_NETWORK environment variable.
    #[serde(default = "default_true")]
    pub allow_network: bool,

    /// Scrape `<a href>` links from the site page when no sitemap exists.
    #[serde(default = "default_true")]
    pub allow_html_fallback: bool,

    /// Upper bound on URLs kept per sitemap crawl.
    #[serde(default = "default_max_sitemap_urls")]
    pub max_sitemap_urls: usize,

    /// Snapshot or artifact loaded into the cache at startup.
    ///
    /// Set via DOCSITE_PREINDEX_PATH environment variable.
    #[serde(default)]
    pub preindex_path: Option<PathBuf>,

    /// Offline builder settings.
    #[serde(default)]
    pub build: BuildSettings,

    /// Artifact downloader settings.
    #[serde(default)]
    pub download: DownloadSettings,
}

fn default_user_agent() -> String {
    "docsite/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_max_sitemap_urls() -> usize {
    50_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            sitemap_ttl_hours: default_ttl_hours(),
            index_ttl_hours: default_ttl_hours(),
            allow_network: true,
            allow_html_fallback: true,
            max_sitemap_urls: default_max_sitemap_urls(),
            preindex_path: None,
            build: BuildSettings::default(),
            download: DownloadSettings::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sitemap_ttl(&self) -> Duration {
        Duration::from_secs(self.sitemap_ttl_hours.saturating_mul(3600))
    }

    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_hours.saturating_mul(3600))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DOCSITE_`
    /// 2. TOML file from `DOCSITE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DOCSITE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DOCSITE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
