//! `Sitemap:` directives from robots.txt.

use std::collections::HashSet;

use robotstxt_rs::RobotsTxt;
use url::Url;

/// Collect `Sitemap:` values from a robots.txt body.
///
/// Trailing `#` comments are stripped and relative values resolve against
/// `robots_url`. Unparseable values are skipped.
pub fn sitemap_urls(body: &str, robots_url: &Url) -> Vec<String> {
    let robots = RobotsTxt::parse(body);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for value in robots.get_sitemaps() {
        let value = value.split('#').next().unwrap_or_default().trim();
        if value.is_empty() {
            continue;
        }
        match robots_url.join(value) {
            Ok(url) if seen.insert(url.to_string()) => urls.push(url.to_string()),
            Ok(_) => {}
            Err(e) => tracing::debug!("skipping robots.txt sitemap {:?}: {}", value, e),
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robots_url() -> Url {
        Url::parse("https://docs.example.com/robots.txt").unwrap()
    }

    #[test]
    fn test_sitemap_lines() {
        let body = "User-agent: *\nDisallow: /private\nSitemap: https://docs.example.com/sitemap.xml\n";
        assert_eq!(sitemap_urls(body, &robots_url()), vec!["https://docs.example.com/sitemap.xml"]);
    }

    #[test]
    fn test_case_insensitive_key_and_whitespace() {
        let body = "  SITEMAP :   https://docs.example.com/a.xml  \nsitemap:https://docs.example.com/b.xml.gz";
        assert_eq!(
            sitemap_urls(body, &robots_url()),
            vec!["https://docs.example.com/a.xml", "https://docs.example.com/b.xml.gz"]
        );
    }

    #[test]
    fn test_relative_and_commented() {
        let body = "# Sitemap: https://docs.example.com/ignored.xml\nSitemap: /sitemap.xml # primary\n";
        assert_eq!(sitemap_urls(body, &robots_url()), vec!["https://docs.example.com/sitemap.xml"]);
    }

    #[test]
    fn test_duplicates_and_garbage() {
        let body = "Sitemap: /s.xml\nSitemap: /s.xml\nSitemap:\n<html>not robots</html>";
        assert_eq!(sitemap_urls(body, &robots_url()), vec!["https://docs.example.com/s.xml"]);
    }
}
