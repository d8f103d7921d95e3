//! Client code for docsite.
//!
//! This crate provides the HTTP fetch pipeline, sitemap and search-index
//! discovery, the site-scoped query engine, and the offline index builder and
//! downloader.

pub mod builder;
pub mod discover;
pub mod downloader;
pub mod extract;
pub mod fetch;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{BuildReport, BuildStatus, IndexBuilder};
pub use discover::SitemapDiscoverer;
pub use downloader::{DownloadReport, DownloadStatus, IndexDownloader};
pub use extract::{LivePageText, PageTextSource};
pub use fetch::{Conditional, FetchClient, FetchConfig, Fetcher, SiteOrigin};
pub use search::{RankedResult, SearchOptions, SearchResponse, SearchSettings, SiteSearch, SphinxMatch};
