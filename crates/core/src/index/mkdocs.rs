//! MkDocs `search_index.json` adapter.

use serde::{Deserialize, Serialize};
use url::Url;

use super::directory_prefixes;
use crate::Error;

const INDEX_SUFFIX: &str = "search/search_index.json";

/// One documented section from an MkDocs search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MkDocsRecord {
    /// Page-relative location, possibly with a `#anchor`.
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize)]
struct RawIndex {
    docs: Vec<MkDocsRecord>,
}

/// Parse a `{"docs": [...]}` body.
pub fn parse(bytes: &[u8]) -> Result<Vec<MkDocsRecord>, Error> {
    let raw: RawIndex =
        serde_json::from_slice(bytes).map_err(|e| Error::Format(format!("mkdocs search index: {e}")))?;
    Ok(raw.docs)
}

/// `<dir>/search/search_index.json` for the site directory and every ancestor.
pub fn index_candidates(site_url: &Url) -> Vec<String> {
    directory_prefixes(site_url)
        .into_iter()
        .map(|prefix| format!("{prefix}{INDEX_SUFFIX}"))
        .collect()
}

/// Strip the `search/search_index.json` suffix, keeping a trailing slash.
pub fn base_from_index_url(index_url: &str) -> String {
    match index_url.strip_suffix(INDEX_SUFFIX) {
        Some(base) => base.to_string(),
        None => match index_url.rfind('/') {
            Some(idx) => index_url[..=idx].to_string(),
            None => index_url.to_string(),
        },
    }
}
