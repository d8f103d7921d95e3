//! Sphinx `searchindex.js` adapter.
//!
//! The file is JavaScript, not JSON: a `Search.setIndex(...)` call whose
//! single argument is the index object. Recent Sphinx releases emit a
//! JSON-compatible object; older ones leave keys unquoted, which is handled
//! by a key-quoting retry.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use super::directory_prefixes;
use crate::Error;

const INDEX_FILE: &str = "searchindex.js";

static BARE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([{,]\s*)([A-Za-z_$][A-Za-z0-9_$]*)\s*:"#).expect("invalid bare key regex"));

/// Inverted index emitted by Sphinx.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SphinxIndex {
    pub filenames: Vec<String>,
    pub titles: Vec<String>,
    /// Output document names; preferred over `filenames` for links when present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docnames: Vec<String>,
    /// Token -> document positions.
    #[serde(default, deserialize_with = "postings_map")]
    pub terms: BTreeMap<String, Vec<usize>>,
    /// Title token -> document positions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "postings_map")]
    pub titleterms: BTreeMap<String, Vec<usize>>,
}

/// Sphinx writes a bare integer when a term occurs in exactly one document.
#[derive(Deserialize)]
#[serde(untagged)]
enum Postings {
    One(usize),
    Many(Vec<usize>),
}

fn postings_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<usize>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Postings>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(term, postings)| {
            let positions = match postings {
                Postings::One(p) => vec![p],
                Postings::Many(ps) => ps,
            };
            (term, positions)
        })
        .collect())
}

impl SphinxIndex {
    /// Page path relative to the index base for document `position`.
    pub fn page_path(&self, position: usize) -> Option<String> {
        if let Some(docname) = self.docnames.get(position) {
            return Some(format!("{docname}.html"));
        }
        let filename = self.filenames.get(position)?;
        for source_ext in [".rst", ".md", ".txt"] {
            if let Some(stem) = filename.strip_suffix(source_ext) {
                return Some(format!("{stem}.html"));
            }
        }
        Some(filename.clone())
    }

    /// Body and title postings together.
    pub fn all_postings(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.terms
            .iter()
            .chain(self.titleterms.iter())
            .map(|(term, positions)| (term.as_str(), positions.as_slice()))
    }

    /// Enforce the length invariant and drop dangling postings.
    pub(crate) fn validated(mut self) -> Result<Self, Error> {
        let docs = self.filenames.len();
        if self.titles.len() != docs {
            return Err(Error::Format(format!(
                "sphinx index: {} filenames but {} titles",
                docs,
                self.titles.len()
            )));
        }
        if !self.docnames.is_empty() && self.docnames.len() != docs {
            tracing::debug!("sphinx index: ignoring docnames with mismatched length");
            self.docnames.clear();
        }
        for positions in self.terms.values_mut().chain(self.titleterms.values_mut()) {
            positions.retain(|&p| p < docs);
        }
        Ok(self)
    }
}

/// Extract the argument of the `Search.setIndex(...)` call.
fn strip_wrapper(text: &str) -> Result<&str, Error> {
    let trimmed = text.trim().trim_end_matches(';').trim_end();
    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }
    let open = trimmed
        .find('(')
        .ok_or_else(|| Error::Format("sphinx index: no call wrapper found".into()))?;
    let close = trimmed
        .rfind(')')
        .filter(|&close| close > open)
        .ok_or_else(|| Error::Format("sphinx index: unbalanced call wrapper".into()))?;
    Ok(trimmed[open + 1..close].trim())
}

/// Parse a `searchindex.js` body.
pub fn parse(bytes: &[u8]) -> Result<SphinxIndex, Error> {
    let text = String::from_utf8_lossy(bytes);
    let object = strip_wrapper(&text)?;

    let index = match serde_json::from_str::<SphinxIndex>(object) {
        Ok(index) => index,
        Err(strict_err) => {
            let quoted = BARE_KEY.replace_all(object, r#"$1"$2":"#);
            serde_json::from_str::<SphinxIndex>(&quoted)
                .map_err(|_| Error::Format(format!("sphinx search index: {strict_err}")))?
        }
    };

    index.validated()
}

/// `<dir>/searchindex.js` for the site directory and every ancestor.
pub fn index_candidates(site_url: &Url) -> Vec<String> {
    directory_prefixes(site_url)
        .into_iter()
        .map(|prefix| format!("{prefix}{INDEX_FILE}"))
        .collect()
}

/// Strip the `searchindex.js` file name, keeping a trailing slash.
pub fn base_from_index_url(index_url: &str) -> String {
    match index_url.rfind('/') {
        Some(idx) => index_url[..=idx].to_string(),
        None => index_url.to_string(),
    }
}
