//! Unified error types for docsite.
//!
//! Most of these never reach a caller of the query engine: network and format
//! failures are logged and degrade to "no data" at the strategy boundary. They
//! surface from the builder, the downloader, and the persisted-state helpers.

/// Unified error type shared by the docsite crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty site map for the builder).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response or transport failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// A search index, sitemap, or artifact body could not be parsed.
    #[error("FORMAT_ERROR: {0}")]
    Format(String),

    /// Artifact carries a schema version this build does not understand.
    #[error("SCHEMA_MISMATCH: unsupported schema_version {found} (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    /// Filesystem failure.
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON_ERROR: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-readable code, used in build and download reports.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::FetchTimeout(_) => "FETCH_TIMEOUT",
            Error::FetchTooLarge(_) => "FETCH_TOO_LARGE",
            Error::HttpError(_) => "HTTP_ERROR",
            Error::Format(_) => "FORMAT_ERROR",
            Error::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}
