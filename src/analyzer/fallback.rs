//! Placeholder metadata for pages the analyzer could not enrich

use crate::analyzer::{Analysis, AnalysisRequest, AnalyzerError, ContentAnalyzer, UNKNOWN};
use async_trait::async_trait;

const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

const MAX_FALLBACK_KEYWORDS: usize = 5;
const MAX_FALLBACK_TOPICS: usize = 3;

/// Analyzer used when enrichment is switched off
///
/// Always fails with [`AnalyzerError::Disabled`], so every record is built
/// from fallback metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineAnalyzer;

#[async_trait]
impl ContentAnalyzer for OfflineAnalyzer {
    fn name(&self) -> &str {
        "offline"
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<Analysis, AnalyzerError> {
        Err(AnalyzerError::Disabled)
    }
}

/// Builds low-confidence metadata from the page's own title and description
pub fn fallback_analysis(title: &str, description: &str) -> Analysis {
    let keywords = fallback_keywords(&format!("{} {}", title, description));
    let topics = keywords.iter().take(MAX_FALLBACK_TOPICS).cloned().collect();

    Analysis {
        keywords,
        description: description.to_string(),
        topics,
        content_type: UNKNOWN.to_string(),
        language: UNKNOWN.to_string(),
        sentiment: UNKNOWN.to_string(),
        target_audience: UNKNOWN.to_string(),
        content_quality: UNKNOWN.to_string(),
        relevance_score: 0.0,
    }
}

/// Words longer than three characters, lowercased, stop words removed
pub fn fallback_keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| word.chars().count() > 3 && !STOP_WORDS.contains(word))
        .take(MAX_FALLBACK_KEYWORDS)
        .map(str::to_string)
        .collect()
}
