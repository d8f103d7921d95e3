//! Page metadata extraction.
//!
//! Ranked results carry a title and a short snippet. Both come from the page
//! HTML through [`scraper`]:
//!
//! - Title: `<title>`, then the first `<h1>`.
//! - Text: visible text of `<main>`/`<article>`/`<body>`, without scripts,
//!   styles, and navigation chrome.
//! - Snippet: an excerpt of that text around the first matched query token.
//!
//! The [`PageTextSource`] trait decouples the query engine from where page
//! text comes from, so tests and offline callers can substitute their own.

pub mod links;
pub mod page;

use std::sync::Arc;

use async_trait::async_trait;

pub use links::{extract_links, same_origin_links};
pub use page::{SNIPPET_CHARS, excerpt, page_text, page_title, strip_tags};

use crate::fetch::Fetcher;

/// Title and snippet for one result page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub snippet: String,
}

/// Supplies plain page text for snippet generation.
#[async_trait]
pub trait PageTextSource: Send + Sync {
    /// Visible text of the page at `url`, or `None` when unavailable.
    async fn page_text(&self, url: &str) -> Option<String>;
}

/// Fetches the live page and extracts its visible text.
#[derive(Clone)]
pub struct LivePageText {
    fetcher: Arc<dyn Fetcher>,
}

impl LivePageText {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PageTextSource for LivePageText {
    async fn page_text(&self, url: &str) -> Option<String> {
        let bytes = self.fetcher.fetch_bytes(url).await?;
        Some(page_text(&String::from_utf8_lossy(&bytes)))
    }
}

/// Fetch `url` once and derive both its title and a snippet for `tokens`.
pub async fn fetch_page_meta(fetcher: &dyn Fetcher, url: &str, tokens: &[String]) -> Option<PageMeta> {
    let bytes = fetcher.fetch_bytes(url).await?;
    let html = String::from_utf8_lossy(&bytes);
    Some(PageMeta { title: page_title(&html), snippet: excerpt(&page_text(&html), tokens) })
}
