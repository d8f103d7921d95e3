//! Core types and shared functionality for docsite.
//!
//! This crate provides:
//! - In-memory discovery cache with fetch coalescing and snapshots
//! - MkDocs and Sphinx search-index adapters
//! - The site index artifact schema
//! - Unified error types
//! - Configuration structures

pub mod artifact;
pub mod cache;
pub mod config;
pub mod error;
pub mod gzip;
pub mod index;

pub use artifact::{SCHEMA_VERSION, SiteIndexArtifact, SitemapRecord};
pub use cache::{CacheStore, IndexCacheEntry, SitemapCacheEntry};
pub use config::{AppConfig, BuildSettings, ConfigError, DownloadSettings, SitemapMode};
pub use error::Error;
pub use index::{IndexKind, IndexPayload, MkDocsRecord, SphinxIndex};
