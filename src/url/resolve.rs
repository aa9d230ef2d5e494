use crate::url::normalize::canonicalize;
use url::Url;

/// Href prefixes that never point at a crawlable page
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "#"];

/// Path fragments of system endpoints that are never worth fetching
const SKIPPED_PATTERNS: &[&str] = &["/cdn-cgi/", "/email-protection", "void(0)"];

/// Resolves an href against the page URL and normalizes the result
///
/// Returns None if the link should be excluded:
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - fragment-only links (same page anchors)
/// - Cloudflare `/cdn-cgi/` and e-mail protection endpoints
/// - anything that is not http(s) after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || is_skipped_link(href) {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if is_skipped_link(absolute.as_str()) {
        return None;
    }

    canonicalize(absolute).ok()
}

/// Returns true for hrefs and URLs that name a script, contact or system endpoint
pub fn is_skipped_link(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    SKIPPED_PREFIXES.iter().any(|p| lower.starts_with(p))
        || SKIPPED_PATTERNS.iter().any(|p| lower.contains(p))
}
