//! Sitemap XML parsing.
//!
//! Sitemaps are flat enough that `<loc>` extraction by pattern is reliable:
//! a `<urlset>` lists page URLs, a `<sitemapindex>` lists child sitemaps.
//! Namespace prefixes, CDATA sections, and the five predefined XML entities
//! are handled.

use std::sync::LazyLock;

use regex::Regex;

static LOC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?loc\s*>(.*?)</(?:[a-z0-9_-]+:)?loc\s*>").expect("invalid loc regex")
});

static SITEMAP_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:[a-z0-9_-]+:)?sitemapindex[\s>]").expect("invalid sitemapindex regex"));

/// A parsed sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// Page URLs.
    UrlSet(Vec<String>),
    /// Child sitemap URLs.
    Index(Vec<String>),
}

/// Parse an (already decompressed) sitemap body.
pub fn parse(bytes: &[u8]) -> SitemapDocument {
    let text = String::from_utf8_lossy(bytes);
    let locs = LOC
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape(strip_cdata(m.as_str().trim())))
        .filter(|loc| !loc.is_empty())
        .collect();

    if SITEMAP_INDEX.is_match(&text) { SitemapDocument::Index(locs) } else { SitemapDocument::UrlSet(locs) }
}

fn strip_cdata(value: &str) -> &str {
    value
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .map(str::trim)
        .unwrap_or(value)
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://docs.example.com/</loc><lastmod>2024-01-01</lastmod></url>
  <url>
    <loc>
      https://docs.example.com/guide/?a=1&amp;b=2
    </loc>
  </url>
</urlset>"#;
        assert_eq!(
            parse(body),
            SitemapDocument::UrlSet(vec![
                "https://docs.example.com/".into(),
                "https://docs.example.com/guide/?a=1&b=2".into(),
            ])
        );
    }

    #[test]
    fn test_parse_sitemap_index() {
        let body = br#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://docs.example.com/sitemap-1.xml</loc></sitemap>
  <sitemap><loc><![CDATA[https://docs.example.com/sitemap-2.xml.gz]]></loc></sitemap>
</sitemapindex>"#;
        assert_eq!(
            parse(body),
            SitemapDocument::Index(vec![
                "https://docs.example.com/sitemap-1.xml".into(),
                "https://docs.example.com/sitemap-2.xml.gz".into(),
            ])
        );
    }

    #[test]
    fn test_parse_namespaced() {
        let body = br#"<sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9"><sm:url><sm:loc>https://a.example.com/x</sm:loc></sm:url></sm:urlset>"#;
        assert_eq!(parse(body), SitemapDocument::UrlSet(vec!["https://a.example.com/x".into()]));
    }

    #[test]
    fn test_parse_not_xml() {
        assert_eq!(parse(b"<html><body>404</body></html>"), SitemapDocument::UrlSet(Vec::new()));
    }
}
