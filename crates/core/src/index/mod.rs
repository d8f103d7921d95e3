//! Client-side search index adapters.
//!
//! Documentation generators ship their own search indexes for in-browser
//! search. Two formats are understood:
//!
//! - **MkDocs**: `search/search_index.json`, a JSON object with a `docs` array
//!   of `{location, title, text}` records.
//! - **Sphinx**: `searchindex.js`, a `Search.setIndex({...})` call wrapping an
//!   inverted index of `filenames`, `titles`, and `terms`.
//!
//! Every function here is pure: candidate URL generation, base-path
//! derivation, and parsing never perform I/O.

pub mod mkdocs;
pub mod sphinx;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

pub use mkdocs::MkDocsRecord;
pub use sphinx::SphinxIndex;

/// Discriminator for the supported index formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    MkDocs,
    Sphinx,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::MkDocs => "mkdocs",
            IndexKind::Sphinx => "sphinx",
        }
    }

    /// Candidate index URLs for a site, highest priority first.
    pub fn candidates(&self, site_url: &Url) -> Vec<String> {
        match self {
            IndexKind::MkDocs => mkdocs::index_candidates(site_url),
            IndexKind::Sphinx => sphinx::index_candidates(site_url),
        }
    }

    /// Base URL that record locations resolve against.
    pub fn base_from_index_url(&self, index_url: &str) -> String {
        match self {
            IndexKind::MkDocs => mkdocs::base_from_index_url(index_url),
            IndexKind::Sphinx => sphinx::base_from_index_url(index_url),
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed search index, normalized per format.
///
/// Serializes untagged: MkDocs as a record array, Sphinx as an object. This is
/// the shape stored under `indexes` in the site index artifact, so the kind is
/// recovered from the JSON shape when reading one back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexPayload {
    MkDocs(Vec<MkDocsRecord>),
    Sphinx(SphinxIndex),
}

impl IndexPayload {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexPayload::MkDocs(_) => IndexKind::MkDocs,
            IndexPayload::Sphinx(_) => IndexKind::Sphinx,
        }
    }

    /// Number of documents (MkDocs sections or Sphinx pages).
    pub fn len(&self) -> usize {
        match self {
            IndexPayload::MkDocs(records) => records.len(),
            IndexPayload::Sphinx(index) => index.filenames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-check invariants of a payload that did not come through
    /// [`parse_index`], such as one read back from an artifact.
    pub fn validated(self) -> Result<Self, Error> {
        match self {
            IndexPayload::MkDocs(_) => Ok(self),
            IndexPayload::Sphinx(index) => index.validated().map(IndexPayload::Sphinx),
        }
    }
}

/// Parse a raw index body of the given kind.
pub fn parse_index(kind: IndexKind, bytes: &[u8]) -> Result<IndexPayload, Error> {
    match kind {
        IndexKind::MkDocs => mkdocs::parse(bytes).map(IndexPayload::MkDocs),
        IndexKind::Sphinx => sphinx::parse(bytes).map(IndexPayload::Sphinx),
    }
}

/// Directory part of a URL path, always ending in `/`.
///
/// A last segment containing a `.` is a file name and is dropped; any other
/// last segment is a directory, so `/en/latest` and `/en/latest/` agree.
pub fn directory_path(path: &str) -> String {
    let (dir, last) = match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("/", path),
    };
    if last.is_empty() || last.contains('.') { dir.to_string() } else { format!("{dir}{last}/") }
}

/// Directory prefixes of a site URL, deepest first, each ending in `/`.
///
/// `https://h/a/b/page.html` yields `https://h/a/b/`, `https://h/a/`, `https://h/`.
pub(crate) fn directory_prefixes(site_url: &Url) -> Vec<String> {
    let origin = site_url.origin().ascii_serialization();

    let mut prefixes = Vec::new();
    let mut current = directory_path(site_url.path());
    loop {
        prefixes.push(format!("{origin}{current}"));
        if current == "/" {
            break;
        }
        let trimmed = current.trim_end_matches('/');
        current = match trimmed.rfind('/') {
            Some(idx) => trimmed[..=idx].to_string(),
            None => "/".to_string(),
        };
    }
    prefixes
}
