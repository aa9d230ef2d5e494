use crate::storage::IndexRecord;

/// Exact-match criteria over enrichment fields
///
/// Unset criteria match everything. Text comparisons ignore ASCII case.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub content_type: Option<String>,
    pub language: Option<String>,
    pub content_quality: Option<String>,
    pub target_audience: Option<String>,
    pub sentiment: Option<String>,
    pub min_relevance: Option<f64>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none()
            && self.language.is_none()
            && self.content_quality.is_none()
            && self.target_audience.is_none()
            && self.sentiment.is_none()
            && self.min_relevance.is_none()
    }

    pub fn matches(&self, record: &IndexRecord) -> bool {
        field_matches(&self.content_type, &record.content_type)
            && field_matches(&self.language, &record.language)
            && field_matches(&self.content_quality, &record.content_quality)
            && field_matches(&self.target_audience, &record.target_audience)
            && field_matches(&self.sentiment, &record.sentiment)
            && self
                .min_relevance
                .map_or(true, |min| record.relevance_score >= min)
    }

    pub fn apply<'a>(&self, records: &'a [IndexRecord]) -> Vec<&'a IndexRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

fn field_matches(wanted: &Option<String>, actual: &str) -> bool {
    wanted
        .as_deref()
        .map_or(true, |wanted| wanted.eq_ignore_ascii_case(actual))
}
