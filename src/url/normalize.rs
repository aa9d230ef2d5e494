use crate::UrlError;
use url::Url;

/// Normalizes a URL into the identity key used by every URL set
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Require a host (the parser lowercases it and drops default ports)
/// 4. Drop credentials
/// 5. Drop the query string and the fragment
/// 6. Empty path becomes `/`
///
/// Two URLs that differ only in query or fragment therefore share one identity.
///
/// # Examples
///
/// ```
/// use site_indexer::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.ORG:443/docs/?page=2#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.org/docs/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(url)
}

/// Applies the normalization rules to an already parsed URL
pub fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    // Both setters only fail for cannot-be-a-base URLs, which http(s) never are
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.set_query(None);
    url.set_fragment(None);

    if url.path().is_empty() {
        url.set_path("/");
    }

    Ok(url)
}
