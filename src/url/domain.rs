use crate::UrlError;
use url::Url;

/// The set of URLs considered in-domain for a crawl
///
/// A URL is in scope when its host and effective port equal the target's.
/// The scheme is ignored, so `http://` and `https://` links to the same host
/// are both followed. Subdomains are separate hosts and out of scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainScope {
    host: String,
    port: Option<u16>,
}

impl DomainScope {
    /// Builds the scope from the seed URL
    pub fn from_url(url: &Url) -> Result<Self, UrlError> {
        let host = extract_domain(url).ok_or(UrlError::MissingDomain)?;
        Ok(Self {
            host,
            port: url.port_or_known_default(),
        })
    }

    /// Returns true if the URL belongs to the target domain
    pub fn contains(&self, url: &Url) -> bool {
        match extract_domain(url) {
            Some(host) => host == self.host && url.port_or_known_default() == self.port,
            None => false,
        }
    }

    /// The target host (lowercase)
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_indexer::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.ORG/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.org".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(seed: &str) -> DomainScope {
        DomainScope::from_url(&Url::parse(seed).unwrap()).unwrap()
    }

    #[test]
    fn test_same_host_in_scope() {
        let scope = scope("https://example.org/");
        assert!(scope.contains(&Url::parse("https://example.org/about").unwrap()));
    }

    #[test]
    fn test_other_host_out_of_scope() {
        let scope = scope("https://example.org/");
        assert!(!scope.contains(&Url::parse("https://other.example/page").unwrap()));
        assert!(!scope.contains(&Url::parse("https://external.com/x").unwrap()));
    }

    #[test]
    fn test_subdomain_out_of_scope() {
        let scope = scope("https://example.org/");
        assert!(!scope.contains(&Url::parse("https://blog.example.org/").unwrap()));
    }

    #[test]
    fn test_scheme_ignored() {
        let scope = scope("https://example.org/");
        // http on port 80 differs from https on 443
        assert!(!scope.contains(&Url::parse("http://example.org/").unwrap()));
        assert!(scope.contains(&Url::parse("http://example.org:443/").unwrap()));
    }

    #[test]
    fn test_port_distinguishes_hosts() {
        let scope = scope("http://127.0.0.1:4000/");
        assert!(scope.contains(&Url::parse("http://127.0.0.1:4000/a").unwrap()));
        assert!(!scope.contains(&Url::parse("http://127.0.0.1:4001/a").unwrap()));
    }

    #[test]
    fn test_host_case_insensitive() {
        let scope = scope("https://Example.ORG/");
        assert_eq!(scope.host(), "example.org");
        assert!(scope.contains(&Url::parse("https://EXAMPLE.org/x").unwrap()));
    }

    #[test]
    fn test_extract_domain_with_port() {
        let url = Url::parse("https://example.org:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.org".to_string()));
    }
}
