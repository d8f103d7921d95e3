//! Scoring for the three search strategies.
//!
//! Every score is a count of distinct query tokens matched, so ranking is
//! deterministic: zero scores are dropped and the stable sort keeps source
//! order among ties.

use std::collections::HashSet;

use docsite_core::index::{MkDocsRecord, SphinxIndex};

/// How a query token is matched against Sphinx index terms.
///
/// Sphinx stores stemmed terms (`authent`, `middlewar`), so exact matching
/// misses most natural-language tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SphinxMatch {
    /// The term must equal the token.
    Exact,
    /// The term equals the token, or is a prefix of it at least
    /// [`MIN_STEM_LEN`] long and covering at least half the token.
    #[default]
    StemPrefix,
}

/// Shortest term accepted as a stem of a longer token.
pub const MIN_STEM_LEN: usize = 4;

/// Distinct tokens contained in the record's lowercase title and text.
pub fn score_mkdocs(record: &MkDocsRecord, tokens: &[String]) -> usize {
    let haystack = format!("{} {}", record.title, record.text).to_lowercase();
    tokens.iter().filter(|token| haystack.contains(token.as_str())).count()
}

/// Per-document scores for a Sphinx index, in document order.
///
/// A document scores one point for each distinct token with a matching term
/// whose postings (body or title) include it.
pub fn score_sphinx(index: &SphinxIndex, tokens: &[String], mode: SphinxMatch) -> Vec<(usize, usize)> {
    let mut scores = vec![0usize; index.filenames.len()];

    for token in tokens {
        let mut docs: HashSet<usize> = HashSet::new();
        for term in matching_terms(token, mode) {
            for postings in [index.terms.get(term), index.titleterms.get(term)].into_iter().flatten() {
                docs.extend(postings.iter().copied());
            }
        }
        for doc in docs {
            if let Some(score) = scores.get_mut(doc) {
                *score += 1;
            }
        }
    }

    scores.into_iter().enumerate().collect()
}

/// Candidate index terms for `token`, longest first.
fn matching_terms(token: &str, mode: SphinxMatch) -> Vec<&str> {
    match mode {
        SphinxMatch::Exact => vec![token],
        SphinxMatch::StemPrefix => {
            let min_len = MIN_STEM_LEN.max(token.len().div_ceil(2));
            if token.len() <= min_len {
                return vec![token];
            }
            (min_len..=token.len())
                .rev()
                .filter(|&end| token.is_char_boundary(end))
                .map(|end| &token[..end])
                .collect()
        }
    }
}

/// Distinct tokens equal to one of the path's segments.
///
/// Segments are compared case-insensitively with `.html`, `.htm`, and `.md`
/// extensions removed.
pub fn score_path(relative_path: &str, tokens: &[String]) -> usize {
    let segments: HashSet<String> = path_segments(relative_path).collect();
    tokens.iter().filter(|token| segments.contains(token.as_str())).count()
}

fn path_segments(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split('/').filter(|s| !s.is_empty()).map(|segment| {
        let lower = segment.to_ascii_lowercase();
        for ext in [".html", ".htm", ".md"] {
            if let Some(stem) = lower.strip_suffix(ext) {
                return stem.to_string();
            }
        }
        lower
    })
}

/// Human-readable title from the last path segment: `route-groups.html`
/// becomes `Route Groups`.
pub fn title_from_path(path: &str) -> String {
    let Some(last) = path_segments(path).last() else {
        return String::new();
    };
    last.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop zero scores and stable-sort by score descending.
pub fn rank<T>(scored: impl IntoIterator<Item = (T, usize)>) -> Vec<(T, usize)> {
    let mut ranked: Vec<(T, usize)> = scored.into_iter().filter(|(_, score)| *score > 0).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}
