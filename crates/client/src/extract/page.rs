//! Page titles, visible text, and snippets.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// Characters kept in a snippet, not counting ellipses.
pub const SNIPPET_CHARS: usize = 240;

/// Characters of context kept before the first matched token.
const LEAD_CHARS: usize = 60;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("invalid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("invalid selector"));
static CONTENT_ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["main", "article", "[role=main]", "body"]
        .iter()
        .map(|s| Selector::parse(s).expect("invalid selector"))
        .collect()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("invalid tag regex"));

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "nav", "header", "footer"];

/// `<title>`, or the first `<h1>` when the title is missing or blank.
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    [&*TITLE, &*H1].into_iter().find_map(|selector| {
        let text = document.select(selector).next()?.text().collect::<String>();
        let text = collapse_whitespace(&text);
        (!text.is_empty()).then_some(text)
    })
}

/// Visible text of the main content area, whitespace-collapsed.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(root) = CONTENT_ROOTS
        .iter()
        .find_map(|selector| document.select(selector).next())
    else {
        return String::new();
    };

    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    collapse_whitespace(&parts.join(" "))
}

/// Remove markup that MkDocs leaves in record text.
pub fn strip_tags(text: &str) -> String {
    collapse_whitespace(&TAG.replace_all(text, " "))
}

/// Up to [`SNIPPET_CHARS`] of `text` around the first occurrence of any token.
///
/// Tokens are lowercase ASCII; the text starts at the beginning when none
/// occurs.
pub fn excerpt(text: &str, tokens: &[String]) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let haystack = text.to_ascii_lowercase();
    let first_match = tokens
        .iter()
        .filter(|token| !token.is_empty())
        .filter_map(|token| haystack.find(token.as_str()))
        .min()
        .unwrap_or(0);

    let start = floor_boundary(text, first_match.saturating_sub(LEAD_CHARS));
    let start = if start == 0 {
        0
    } else {
        // begin on a word
        text[start..]
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map_or(start, |(i, c)| start + i + c.len_utf8())
            .min(first_match)
    };
    let end = floor_boundary(text, (start + SNIPPET_CHARS).min(text.len()));

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(text[start..end].trim());
    if end < text.len() {
        snippet.push_str("...");
    }
    snippet
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
