//! Link harvesting from HTML documents.

use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use crate::fetch::SiteOrigin;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector"));

/// Extract `http(s)` link targets from an HTML document, resolved against
/// `base_url`, in document order.
///
/// Fragments are dropped, so `page#a` and `page#b` collapse into one link.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ANCHOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Ok(mut resolved) = base_url.join(href.trim()) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        resolved.set_fragment(None);

        if seen.insert(resolved.to_string()) {
            links.push(resolved);
        }
    }

    links
}

/// Absolute same-origin link targets of a page, in document order.
pub fn same_origin_links(html: &str, page_url: &Url) -> Vec<String> {
    let Some(origin) = SiteOrigin::of(page_url) else {
        return Vec::new();
    };

    extract_links(html, page_url)
        .into_iter()
        .filter(|url| origin.contains(url))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_relative() {
        let html = r#"
            <html>
                <body>
                    <a href="/about">About</a>
                    <a href="contact">Contact</a>
                </body>
            </html>
        "#;

        let base = Url::parse("https://example.com/path/").unwrap();
        let links = extract_links(html, &base);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].as_str(), "https://example.com/about");
        assert_eq!(links[1].as_str(), "https://example.com/path/contact");
    }

    #[test]
    fn test_extract_links_fragments_collapse() {
        let html = r##"
            <a href="guide/#install">Install</a>
            <a href="guide/#usage">Usage</a>
            <a href="#top">Top</a>
        "##;

        let base = Url::parse("https://example.com/docs/").unwrap();
        let links = extract_links(html, &base);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].as_str(), "https://example.com/docs/guide/");
        assert_eq!(links[1].as_str(), "https://example.com/docs/");
    }

    #[test]
    fn test_extract_links_skips_non_http() {
        let html = r#"
            <a href="mailto:team@example.com">Mail</a>
            <a href="javascript:void(0)">Noop</a>
            <a href="ftp://example.com/file">FTP</a>
            <a href="/ok">Ok</a>
        "#;

        let base = Url::parse("https://example.com").unwrap();
        let links = extract_links(html, &base);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/ok");
    }

    #[test]
    fn test_same_origin_links() {
        let html = r#"
            <a href="/a/">A</a>
            <a href="https://example.com/b/">B</a>
            <a href="https://cdn.example.com/c/">C</a>
            <a href="http://example.com/d/">D</a>
            <a href="/a/">A again</a>
        "#;

        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(same_origin_links(html, &base), vec!["https://example.com/a/", "https://example.com/b/"]);
    }

    #[test]
    fn test_same_origin_links_no_links() {
        let base = Url::parse("https://example.com").unwrap();
        assert!(same_origin_links("<p>No links here</p>", &base).is_empty());
    }
}
