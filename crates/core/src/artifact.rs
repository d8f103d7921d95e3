//! The consolidated site index artifact.
//!
//! Written by the offline builder, fetched by the downloader, and loaded into
//! the cache by the query engine. All three agree on this one schema:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "generated_at": "2025-01-01T00:00:00Z",
//!   "sitemaps": { "https://docs.example.com": { "urls": ["..."] } },
//!   "indexes": { "https://docs.example.com/search/search_index.json": [ ... ] }
//! }
//! ```
//!
//! `indexes` values are an MkDocs record array or a Sphinx index object.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::IndexPayload;
use crate::{Error, gzip};

/// The only schema version this build reads or writes.
pub const SCHEMA_VERSION: u32 = 1;

/// Sitemap URLs recorded for one origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapRecord {
    pub urls: Vec<String>,
    /// When the URLs were crawled; absent in older artifacts, which fall
    /// back to `generated_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Schema-versioned site index artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteIndexArtifact {
    pub schema_version: u32,
    /// ISO-8601 timestamp; accepted with or without a UTC offset.
    pub generated_at: String,
    #[serde(default)]
    pub sitemaps: BTreeMap<String, SitemapRecord>,
    #[serde(default)]
    pub indexes: BTreeMap<String, IndexPayload>,
}

impl SiteIndexArtifact {
    /// An empty artifact stamped with the current time.
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            sitemaps: BTreeMap::new(),
            indexes: BTreeMap::new(),
        }
    }

    /// `generated_at` as UTC; offset-less timestamps are taken as UTC.
    pub fn generated_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.generated_at)
    }

    /// Parse and validate an artifact body, plain or gzip.
    ///
    /// A Sphinx index whose titles do not line up with its filenames rejects
    /// the whole artifact; postings past the last document are dropped.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let body = gzip::maybe_decompress(bytes, "", gzip::MAX_INFLATED_BYTES)?;

        #[derive(Deserialize)]
        struct VersionHeader {
            schema_version: u32,
        }

        let header: VersionHeader = serde_json::from_slice(&body)?;
        if header.schema_version != SCHEMA_VERSION {
            return Err(Error::SchemaMismatch { found: header.schema_version, expected: SCHEMA_VERSION });
        }

        let mut artifact: Self = serde_json::from_slice(&body)?;
        artifact.indexes = std::mem::take(&mut artifact.indexes)
            .into_iter()
            .map(|(index_url, payload)| Ok((index_url, payload.validated()?)))
            .collect::<Result<_, Error>>()?;
        Ok(artifact)
    }

    /// Read and validate an artifact file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, Error> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_slice(&bytes)
    }

    pub fn to_bytes(&self, gzip_output: bool) -> Result<Vec<u8>, Error> {
        let json = serde_json::to_vec(self)?;
        if gzip_output { gzip::compress(&json) } else { Ok(json) }
    }

    /// Serialize and write atomically.
    pub fn write(&self, path: impl AsRef<Path>, gzip_output: bool) -> Result<(), Error> {
        write_atomic(path.as_ref(), &self.to_bytes(gzip_output)?)
    }
}

impl Default for SiteIndexArtifact {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Write `bytes` to `path` via a sibling temp file and rename.
///
/// Readers observe either the old file or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MkDocsRecord;

    fn sample() -> SiteIndexArtifact {
        let mut artifact = SiteIndexArtifact::new();
        artifact.sitemaps.insert(
            "https://docs.example.com".into(),
            SitemapRecord { urls: vec!["https://docs.example.com/guide/".into()], fetched_at: None },
        );
        artifact.indexes.insert(
            "https://docs.example.com/search/search_index.json".into(),
            IndexPayload::MkDocs(vec![MkDocsRecord {
                location: "guide/".into(),
                title: "Guide".into(),
                text: "Getting started".into(),
            }]),
        );
        artifact
    }

    #[test]
    fn test_from_slice_accepts_minimal_artifact() {
        let body = br#"{"schema_version":1,"generated_at":"2025-01-01T00:00:00","sitemaps":{},"indexes":{}}"#;
        let artifact = SiteIndexArtifact::from_slice(body).unwrap();
        assert!(artifact.sitemaps.is_empty());
        assert_eq!(
            artifact.generated_at_utc().unwrap().to_rfc3339(),
            "2025-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_from_slice_rejects_unknown_schema() {
        let body = br#"{"schema_version":2,"generated_at":"2025-01-01T00:00:00Z","sitemaps":{},"indexes":{}}"#;
        let result = SiteIndexArtifact::from_slice(body);
        assert!(matches!(result, Err(Error::SchemaMismatch { found: 2, expected: 1 })));
    }

    #[test]
    fn test_from_slice_validates_sphinx_indexes() {
        let mismatched = br#"{"schema_version":1,"generated_at":"2025-01-01T00:00:00Z","indexes":{
            "https://docs.example.com/searchindex.js":{"filenames":["a.html","b.html"],"titles":["A"],"terms":{}}
        }}"#;
        assert!(matches!(SiteIndexArtifact::from_slice(mismatched), Err(Error::Format(_))));

        let dangling = br#"{"schema_version":1,"generated_at":"2025-01-01T00:00:00Z","indexes":{
            "https://docs.example.com/searchindex.js":{"filenames":["a.html"],"titles":["A"],"terms":{"auth":[0,7]}}
        }}"#;
        let artifact = SiteIndexArtifact::from_slice(dangling).unwrap();
        let IndexPayload::Sphinx(index) = &artifact.indexes["https://docs.example.com/searchindex.js"] else {
            panic!("expected a sphinx payload");
        };
        assert_eq!(index.terms["auth"], vec![0]);
    }

    #[test]
    fn test_from_slice_rejects_garbage() {
        assert!(SiteIndexArtifact::from_slice(b"<html>").is_err());
        assert!(SiteIndexArtifact::from_slice(br#"{"generated_at":"x"}"#).is_err());
    }

    #[test]
    fn test_write_and_read_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("docs_site_index.json.gz");
        let artifact = sample();

        artifact.write(&path, true).unwrap();
        let raw = std::fs::read(&path).unwrap();
        assert!(gzip::is_gzip(&raw));

        let back = SiteIndexArtifact::read(&path).unwrap();
        assert_eq!(back, artifact);
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2025-01-01T00:00:00Z").is_some());
        assert!(parse_timestamp("2025-01-01T00:00:00.123456").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
