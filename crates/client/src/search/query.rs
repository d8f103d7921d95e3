//! Site-scoped query parsing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use docsite_core::index::directory_path;

use crate::fetch::{SiteOrigin, canonicalize};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9_-]+").expect("invalid word regex"));

/// A parsed `site:<url> terms...` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteQuery {
    /// The directive's URL, canonicalized.
    pub site_url: Url,
    pub origin: SiteOrigin,
    /// Directory the results must live under; always ends in `/`.
    pub path_prefix: String,
    /// Lowercase, deduplicated, in query order.
    pub tokens: Vec<String>,
}

impl SiteQuery {
    /// Parse a query whose first word is a `site:` directive.
    ///
    /// Returns `None` when the directive is missing or its URL is unusable.
    pub fn parse(query: &str) -> Option<Self> {
        let query = query.trim_start();
        let (directive, rest) = match query.split_once(char::is_whitespace) {
            Some((directive, rest)) => (directive, rest),
            None => (query, ""),
        };

        let value = directive
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("site:"))
            .map(|_| &directive[5..])?;
        if value.is_empty() {
            return None;
        }

        let site_url = canonicalize(value).ok()?;
        let origin = SiteOrigin::of(&site_url)?;
        let path_prefix = directory_path(site_url.path());

        Some(Self { site_url, origin, path_prefix, tokens: tokenize(rest) })
    }

    /// Whether `url` is on the query's origin and under its path prefix.
    pub fn contains(&self, url: &Url) -> bool {
        if !self.origin.contains(url) {
            return false;
        }
        let path = url.path();
        path.starts_with(&self.path_prefix) || path == self.path_prefix.trim_end_matches('/')
    }

    /// Path of `url` below the prefix, or `None` when outside it.
    pub fn relative_path<'u>(&self, url: &'u Url) -> Option<&'u str> {
        if !self.contains(url) {
            return None;
        }
        Some(url.path().strip_prefix(self.path_prefix.as_str()).unwrap_or_default())
    }
}

/// Lowercase words of `text`, deduplicated in order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    WORD.find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
