//! HTTP fetcher implementation
//!
//! One GET per call, bounded by the client timeout, with every outcome encoded
//! in the returned [`FetchResult`]. The fetcher keeps no per-run state and is
//! shared by all workers; pacing between requests is the caller's job.
//!
//! Redirects are followed by hand, one hop at a time, so a hop that leaves the
//! caller's [`DomainScope`] is reported instead of requested.

use crate::config::UserAgentConfig;
use crate::url::DomainScope;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, Response};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// What happened when a URL was fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx response with an HTML (or unlabelled) body
    Success {
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value, if the server sent one
        content_type: Option<String>,
        /// Page body content
        body: String,
    },

    /// Non-2xx response
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Response is not HTML
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// A redirect pointed outside the domain scope; the target was not requested
    RedirectOutOfScope {
        /// Where the redirect pointed
        location: String,
    },

    /// Redirect loop, too many hops or an unusable Location header
    RedirectError {
        /// Error description
        error: String,
    },

    /// Timeout, refused connection, TLS failure, broken body...
    NetworkError {
        /// Error description
        error: String,
        timed_out: bool,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Human readable reason for any non-success outcome
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::HttpError { status_code } => Some(format!("HTTP {}", status_code)),
            Self::ContentMismatch { content_type } => {
                Some(format!("Expected HTML, got {}", content_type))
            }
            Self::RedirectOutOfScope { location } => {
                Some(format!("Redirected off-site to {}", location))
            }
            Self::RedirectError { error } => Some(error.clone()),
            Self::NetworkError { error, .. } => Some(error.clone()),
        }
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested
    pub url: Url,
    /// The URL the response came from, after in-scope redirects
    pub final_url: Url,
    pub fetched_at: DateTime<Utc>,
    pub outcome: FetchOutcome,
}

/// Stateless HTTP fetcher shared by all workers
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Builds a fetcher with the crawler's user agent and a request timeout
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Identifies the crawler to servers
    /// * `timeout` - Upper bound for one whole request, body included
    pub fn new(user_agent: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, timeout)?;
        Ok(Self { client })
    }

    /// Fetches a URL, following redirects only while they stay in `scope`
    ///
    /// Never fails: 4xx/5xx and network errors are encoded in the outcome.
    /// There are no retries; the caller decides what a failure means.
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | 2xx, HTML or no Content-Type | Success |
    /// | 2xx, other Content-Type | ContentMismatch |
    /// | Non-2xx (redirects without Location included) | HttpError |
    /// | Redirect leaving `scope` | RedirectOutOfScope |
    /// | Redirect loop, more than 10 hops | RedirectError |
    /// | Timeout | NetworkError (timed_out) |
    /// | Connection refused, TLS, body read error | NetworkError |
    pub async fn fetch(&self, url: &Url, scope: &DomainScope) -> FetchResult {
        let mut current = url.clone();
        let mut seen = HashSet::from([current.to_string()]);

        for _ in 0..=MAX_REDIRECTS {
            let response = match self.client.get(current.clone()).send().await {
                Ok(response) => response,
                Err(e) => return fetch_result(url, current, classify_error(&e)),
            };

            let Some(location) = redirect_location(&response) else {
                let outcome = read_response(response).await;
                return fetch_result(url, current, outcome);
            };

            let next = match current.join(&location) {
                Ok(next) => next,
                Err(e) => {
                    let outcome = FetchOutcome::RedirectError {
                        error: format!("Invalid redirect location {}: {}", location, e),
                    };
                    return fetch_result(url, current, outcome);
                }
            };

            if !scope.contains(&next) {
                tracing::debug!("Not following redirect from {} to {}", current, next);
                let outcome = FetchOutcome::RedirectOutOfScope {
                    location: next.to_string(),
                };
                return fetch_result(url, current, outcome);
            }

            if !seen.insert(next.to_string()) {
                let outcome = FetchOutcome::RedirectError {
                    error: "Redirect loop".to_string(),
                };
                return fetch_result(url, current, outcome);
            }

            tracing::trace!("Redirect {} -> {}", current, next);
            current = next;
        }

        let outcome = FetchOutcome::RedirectError {
            error: "Too many redirects".to_string(),
        };
        fetch_result(url, current, outcome)
    }

}

fn fetch_result(requested: &Url, final_url: Url, outcome: FetchOutcome) -> FetchResult {
    FetchResult {
        url: requested.clone(),
        final_url,
        fetched_at: Utc::now(),
        outcome,
    }
}

/// The Location of a 3xx response, if it has one
fn redirect_location(response: &Response) -> Option<String> {
    if !response.status().is_redirection() {
        return None;
    }
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn read_response(response: Response) -> FetchOutcome {
    let status = response.status();
    if !status.is_success() {
        return FetchOutcome::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(ct) = &content_type {
        if !ct.to_ascii_lowercase().contains("html") {
            return FetchOutcome::ContentMismatch {
                content_type: ct.clone(),
            };
        }
    }

    match response.text().await {
        Ok(body) => FetchOutcome::Success {
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => classify_error(&e),
    }
}

fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

fn classify_error(e: &reqwest::Error) -> FetchOutcome {
    if e.is_timeout() {
        FetchOutcome::NetworkError {
            error: "Request timeout".to_string(),
            timed_out: true,
        }
    } else if e.is_connect() {
        FetchOutcome::NetworkError {
            error: "Connection refused".to_string(),
            timed_out: false,
        }
    } else {
        FetchOutcome::NetworkError {
            error: e.to_string(),
            timed_out: false,
        }
    }
}
