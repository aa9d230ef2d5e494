//! Fuzzy search over the index record repository
//!
//! Each record is scored field by field. A field contributes its similarity,
//! times the field's weight, only when the similarity exceeds the threshold.
//! Records that score nothing are dropped; the rest come back best first.

mod filter;
mod fuzzy;

pub use filter::SearchFilter;
pub use fuzzy::{partial_ratio, ratio};

use crate::storage::IndexRecord;

/// Similarity a field must exceed to count, on the 0-100 scale
pub const DEFAULT_THRESHOLD: u32 = 70;

const KEYWORD_WEIGHT: f64 = 2.0;
const TITLE_WEIGHT: f64 = 1.5;
const TOPIC_WEIGHT: f64 = 1.2;
const DESCRIPTION_WEIGHT: f64 = 1.0;

/// Which part of a record matched the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedField {
    Keyword,
    Title,
    Topic,
    Description,
}

/// A scored search result
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub record: &'a IndexRecord,
    pub score: f64,
    pub matched: Vec<MatchedField>,
}

/// Scores every record against `query` and returns the matches, best first
///
/// # Arguments
///
/// * `records` - The repository contents
/// * `query` - Free text; compared case-insensitively
/// * `threshold` - Minimum similarity (exclusive) for a field to count
///
/// # Example
///
/// ```no_run
/// use site_indexer::search::{search, DEFAULT_THRESHOLD};
/// use site_indexer::storage::{SqliteStorage, Storage};
/// use std::path::Path;
///
/// let storage = SqliteStorage::new(Path::new("site-index.db")).unwrap();
/// let records = storage.load_records().unwrap();
/// for hit in search(&records, "admissions", DEFAULT_THRESHOLD).iter().take(5) {
///     println!("{:.1} {}", hit.score, hit.record.url);
/// }
/// ```
pub fn search<'a>(records: &'a [IndexRecord], query: &str, threshold: u32) -> Vec<SearchHit<'a>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit<'a>> = records
        .iter()
        .filter_map(|record| score_record(record, &query, threshold))
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}

/// Scores one record; `query` must already be lowercased
fn score_record<'a>(record: &'a IndexRecord, query: &str, threshold: u32) -> Option<SearchHit<'a>> {
    let mut score = 0.0;
    let mut matched = Vec::new();

    let mut add = |similarity: u32, weight: f64, field: MatchedField| {
        if similarity > threshold {
            score += similarity as f64 * weight;
            if !matched.contains(&field) {
                matched.push(field);
            }
        }
    };

    for keyword in &record.keywords {
        add(ratio(query, &keyword.to_lowercase()), KEYWORD_WEIGHT, MatchedField::Keyword);
    }

    add(
        partial_ratio(query, &record.title.to_lowercase()),
        TITLE_WEIGHT,
        MatchedField::Title,
    );

    for topic in &record.topics {
        add(ratio(query, &topic.to_lowercase()), TOPIC_WEIGHT, MatchedField::Topic);
    }

    add(
        partial_ratio(query, &record.description.to_lowercase()),
        DESCRIPTION_WEIGHT,
        MatchedField::Description,
    );

    (score > 0.0).then(|| SearchHit {
        record,
        score,
        matched,
    })
}
