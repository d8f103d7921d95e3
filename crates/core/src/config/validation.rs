//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 200MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - either TTL is 0
    /// - `build.max_concurrent_sites` is outside 1..=64
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 200 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 200MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.sitemap_ttl_hours == 0 {
            return Err(ConfigError::Invalid { field: "sitemap_ttl_hours".into(), reason: "must be at least 1".into() });
        }
        if self.index_ttl_hours == 0 {
            return Err(ConfigError::Invalid { field: "index_ttl_hours".into(), reason: "must be at least 1".into() });
        }

        let workers = self.build.max_concurrent_sites;
        if workers == 0 || workers > 64 {
            return Err(ConfigError::Invalid {
                field: "build.max_concurrent_sites".into(),
                reason: "must be between 1 and 64".into(),
            });
        }

        if self.download.auto_download && self.download.urls.is_empty() {
            tracing::warn!(
                path = %self.download.path.display(),
                "download.auto_download is set but download.urls is empty; ensure will report an error"
            );
        }

        Ok(())
    }
}
