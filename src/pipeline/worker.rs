//! One URL's traversal of fetch, extract and analyze
//!
//! A worker owns its URL from admission to completion and hands back a
//! [`UrlOutcome`]. It never touches storage or shared counters.

use crate::analyzer::{fallback_analysis, Analysis, AnalysisRequest, AnalyzerError, ContentAnalyzer};
use crate::crawler::{FetchOutcome, Fetcher};
use crate::extract::{ContentExtractor, ExtractedPage};
use crate::pipeline::PipelineError;
use crate::state::PipelineState;
use crate::storage::IndexRecord;
use crate::url::{normalize_url, DomainScope};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Error marker for pages too short to be worth analyzing
pub const INSUFFICIENT_CONTENT: &str = "Insufficient content";

const NO_TITLE: &str = "No title found";
const NO_DESCRIPTION: &str = "No description available";

/// What happened to one URL
#[derive(Debug)]
pub struct UrlOutcome {
    pub url: String,
    /// Terminal state reached
    pub state: PipelineState,
    pub result: Result<IndexRecord, PipelineError>,
}

/// Everything a worker needs, shared read-only by all workers
pub struct Worker {
    pub(crate) fetcher: Fetcher,
    pub(crate) extractor: ContentExtractor,
    pub(crate) analyzer: Arc<dyn ContentAnalyzer>,
    pub(crate) analyzer_timeout: Duration,
    pub(crate) min_content_chars: usize,
    pub(crate) politeness_delay: Duration,
}

impl Worker {
    /// Runs one URL to a terminal state, then waits out the politeness delay
    pub async fn process(&self, url: String) -> UrlOutcome {
        let mut state = PipelineState::Pending;
        let result = self.traverse(&url, &mut state).await;

        if result.is_err() && !state.is_terminal() {
            state = PipelineState::Failed;
        }

        match &result {
            Ok(record) if record.is_degraded() => {
                tracing::warn!(
                    "Degraded record for {}: {}",
                    url,
                    record.error.as_deref().unwrap_or_default()
                );
            }
            Ok(_) => tracing::debug!("Indexed {}", url),
            Err(e) => tracing::warn!("Failed {}: {}", url, e),
        }

        // Pacing: the slot stays taken until the delay has passed
        tokio::time::sleep(self.politeness_delay).await;

        UrlOutcome { url, state, result }
    }

    async fn traverse(
        &self,
        url: &str,
        state: &mut PipelineState,
    ) -> Result<IndexRecord, PipelineError> {
        let page_url = normalize_url(url).map_err(|e| PipelineError::InvalidUrl(e.to_string()))?;

        let scope = DomainScope::from_url(&page_url)
            .map_err(|e| PipelineError::InvalidUrl(e.to_string()))?;

        enter(state, PipelineState::Fetching)?;
        let fetched = self.fetcher.fetch(&page_url, &scope).await;
        let body = match fetched.outcome {
            FetchOutcome::Success { body, .. } => body,
            FetchOutcome::HttpError { status_code } => {
                return Err(PipelineError::HttpStatus(status_code))
            }
            FetchOutcome::ContentMismatch { content_type } => {
                return Err(PipelineError::NotHtml(content_type))
            }
            FetchOutcome::RedirectOutOfScope { location } => {
                return Err(PipelineError::Fetch(format!("redirected off-site to {}", location)))
            }
            FetchOutcome::RedirectError { error } | FetchOutcome::NetworkError { error, .. } => {
                return Err(PipelineError::Fetch(error))
            }
        };

        enter(state, PipelineState::Extracting)?;
        // Links resolve against where the page was served from; the record
        // stays keyed by the URL that was asked for
        let mut page = self.extractor.extract(&body, &fetched.final_url, &scope)?;
        page.url = page_url.to_string();

        if page.char_count() < self.min_content_chars {
            enter(state, PipelineState::Indexed)?;
            return Ok(degraded_record(&page, INSUFFICIENT_CONTENT.to_string()));
        }

        enter(state, PipelineState::Analyzing)?;
        let request = AnalysisRequest {
            url: page.url.clone(),
            title: page.title.clone().unwrap_or_default(),
            description: page.description.clone().unwrap_or_default(),
            text: page.text.clone(),
        };

        let analysis = match tokio::time::timeout(self.analyzer_timeout, self.analyzer.analyze(&request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(AnalyzerError::Timeout(self.analyzer_timeout.as_secs())),
        };

        enter(state, PipelineState::Indexed)?;
        Ok(match analysis {
            Ok(analysis) => build_record(&page, analysis, None),
            Err(e) => degraded_record(&page, e.marker()),
        })
    }
}

fn enter(state: &mut PipelineState, next: PipelineState) -> Result<(), PipelineError> {
    let from = *state;
    state
        .advance(next)
        .map_err(|_| PipelineError::Transition { from, to: next })?;
    tracing::trace!("{} -> {}", from, next);
    Ok(())
}

/// A record whose enrichment fields come from the page itself
pub fn degraded_record(page: &ExtractedPage, error: String) -> IndexRecord {
    let analysis = fallback_analysis(
        page.title.as_deref().unwrap_or(NO_TITLE),
        page.description.as_deref().unwrap_or_default(),
    );
    build_record(page, analysis, Some(error))
}

/// Combines extraction metadata with an analysis
pub fn build_record(page: &ExtractedPage, analysis: Analysis, error: Option<String>) -> IndexRecord {
    let description = if analysis.description.trim().is_empty() {
        page.description
            .clone()
            .unwrap_or_else(|| NO_DESCRIPTION.to_string())
    } else {
        analysis.description
    };

    IndexRecord {
        url: page.url.clone(),
        title: page.title.clone().unwrap_or_else(|| NO_TITLE.to_string()),
        description,
        keywords: analysis.keywords,
        topics: analysis.topics,
        content_type: analysis.content_type,
        language: analysis.language,
        sentiment: analysis.sentiment,
        target_audience: analysis.target_audience,
        content_quality: analysis.content_quality,
        relevance_score: analysis.relevance_score,
        internal_links: page.links.clone(),
        word_count: page.word_count() as u32,
        content_length: page.char_count() as u32,
        has_meta_description: page.description.is_some(),
        indexed_at: Utc::now(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::UNKNOWN;
    use crate::extract::PageLink;

    fn page(description: Option<&str>) -> ExtractedPage {
        ExtractedPage {
            url: "https://example.org/guide".to_string(),
            title: Some("Ownership Guide".to_string()),
            description: description.map(str::to_string),
            text: "Each value has a single owner".to_string(),
            links: vec![PageLink {
                url: "https://example.org/borrowing".to_string(),
                text: "borrowing".to_string(),
            }],
            region: "main".to_string(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_record_from_analysis() {
        let analysis = Analysis {
            keywords: vec!["ownership".to_string()],
            description: "How ownership works".to_string(),
            topics: vec!["memory".to_string()],
            content_type: "documentation".to_string(),
            language: "en".to_string(),
            sentiment: "neutral".to_string(),
            target_audience: "technical".to_string(),
            content_quality: "high".to_string(),
            relevance_score: 0.9,
        };

        let record = build_record(&page(Some("meta")), analysis, None);

        assert_eq!(record.title, "Ownership Guide");
        assert_eq!(record.description, "How ownership works");
        assert_eq!(record.word_count, 6);
        assert_eq!(record.content_length, 29);
        assert!(record.has_meta_description);
        assert_eq!(record.internal_links.len(), 1);
        assert!(!record.is_degraded());
    }

    #[test]
    fn test_empty_analysis_description_falls_back_to_meta() {
        let analysis = fallback_analysis("t", "");
        let record = build_record(&page(Some("From meta tag")), analysis, None);
        assert_eq!(record.description, "From meta tag");
    }

    #[test]
    fn test_degraded_record() {
        let record = degraded_record(&page(None), "JSON parsing failed".to_string());

        assert!(record.is_degraded());
        assert_eq!(record.error.as_deref(), Some("JSON parsing failed"));
        assert_eq!(record.description, NO_DESCRIPTION);
        assert!(!record.has_meta_description);
        assert_eq!(record.keywords, vec!["ownership", "guide"]);
        assert_eq!(record.topics, vec!["ownership", "guide"]);
        assert_eq!(record.content_type, UNKNOWN);
    }

    #[test]
    fn test_enter_rejects_skipping_stages() {
        let mut state = PipelineState::Pending;
        assert!(matches!(
            enter(&mut state, PipelineState::Indexed),
            Err(PipelineError::Transition { .. })
        ));
        assert_eq!(state, PipelineState::Pending);
    }
}
