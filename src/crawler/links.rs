//! Link discovery for the crawl phase
//!
//! Discovery follows every anchor on the page, navigation and footer included,
//! since those are often the only path to a section of the site. This differs
//! from the content extractor, which keeps only links from the main region.

use crate::url::resolve_link;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts all followable links from an HTML document
///
/// # Included
///
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// # Excluded
///
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only links
/// - Anything that does not resolve to an http(s) URL
///
/// Links come back canonicalized, without duplicates, in document order.
/// Domain filtering is left to the frontier.
///
/// # Example
///
/// ```
/// use site_indexer::crawler::discover_links;
/// use url::Url;
///
/// let base = Url::parse("https://example.org/docs/").unwrap();
/// let links = discover_links(r#"<a href="intro#top">Intro</a>"#, &base);
/// assert_eq!(links[0].as_str(), "https://example.org/docs/intro");
/// ```
pub fn discover_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base_url) {
            if seen.insert(url.to_string()) {
                links.push(url);
            }
        }
    };

    if let Ok(anchor_selector) = Selector::parse("a[href]") {
        for element in document.select(&anchor_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.org/page").unwrap()
    }

    fn paths(links: &[Url]) -> Vec<String> {
        links.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_links_from_whole_page() {
        let html = r#"
            <html><body>
                <nav><a href="/nav">Nav</a></nav>
                <main><a href="/main">Main</a></main>
                <footer><a href="/footer">Footer</a></footer>
            </body></html>
        "#;
        assert_eq!(
            paths(&discover_links(html, &base_url())),
            vec![
                "https://example.org/nav",
                "https://example.org/main",
                "https://example.org/footer"
            ]
        );
    }

    #[test]
    fn test_relative_path_and_fragment_stripped() {
        let html = r#"<a href="other#section">Other</a>"#;
        assert_eq!(
            paths(&discover_links(html, &base_url())),
            vec!["https://example.org/other"]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let html = r#"<a href="/a">A</a><a href="/a?x=1">A again</a><a href="/a#b">A</a>"#;
        assert_eq!(discover_links(html, &base_url()).len(), 1);
    }

    #[test]
    fn test_external_links_kept_for_frontier_to_filter() {
        let html = r#"<a href="https://external.com/x">X</a>"#;
        assert_eq!(
            paths(&discover_links(html, &base_url())),
            vec!["https://external.com/x"]
        );
    }

    #[test]
    fn test_skipped_links() {
        let html = r##"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:a@example.org">mail</a>
            <a href="tel:+123">call</a>
            <a href="data:text/html,x">data</a>
            <a href="#top">top</a>
            <a href="/file.pdf" download>download</a>
            <a href="/cdn-cgi/l/email-protection">protected</a>
        "##;
        assert!(discover_links(html, &base_url()).is_empty());
    }

    #[test]
    fn test_nofollow_is_followed() {
        let html = r#"<a href="/page2" rel="nofollow">Link</a>"#;
        assert_eq!(discover_links(html, &base_url()).len(), 1);
    }

    #[test]
    fn test_canonical_link() {
        let html = r#"<html><head><link rel="canonical" href="https://example.org/canonical" /></head><body></body></html>"#;
        assert_eq!(
            paths(&discover_links(html, &base_url())),
            vec!["https://example.org/canonical"]
        );
    }
}
