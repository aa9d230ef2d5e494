//! Statistics over the index record repository

use crate::storage::IndexRecord;
use serde::Serialize;
use std::collections::HashMap;

/// How many keywords and topics the statistics keep
pub const TOP_TERMS: usize = 10;

/// Repository summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStatistics {
    /// Total number of records
    pub total_records: u64,

    /// Records produced without a successful analysis
    pub degraded_records: u64,

    /// Count per value, most common first
    pub content_types: Vec<(String, u64)>,
    pub languages: Vec<(String, u64)>,
    pub quality: Vec<(String, u64)>,
    pub sentiment: Vec<(String, u64)>,
    pub audiences: Vec<(String, u64)>,

    /// Mean relevance score, 0.0 for an empty repository
    pub average_relevance: f64,

    /// Most frequent keywords and topics, lowercased
    pub top_keywords: Vec<(String, u64)>,
    pub top_topics: Vec<(String, u64)>,
}

impl IndexStatistics {
    pub fn from_records(records: &[IndexRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut content_types = HashMap::new();
        let mut languages = HashMap::new();
        let mut quality = HashMap::new();
        let mut sentiment = HashMap::new();
        let mut audiences = HashMap::new();
        let mut keywords = HashMap::new();
        let mut topics = HashMap::new();
        let mut total_relevance = 0.0;
        let mut degraded_records = 0;

        for record in records {
            *content_types.entry(record.content_type.clone()).or_insert(0) += 1;
            *languages.entry(record.language.clone()).or_insert(0) += 1;
            *quality.entry(record.content_quality.clone()).or_insert(0) += 1;
            *sentiment.entry(record.sentiment.clone()).or_insert(0) += 1;
            *audiences.entry(record.target_audience.clone()).or_insert(0) += 1;

            for keyword in &record.keywords {
                *keywords.entry(keyword.to_lowercase()).or_insert(0) += 1;
            }
            for topic in &record.topics {
                *topics.entry(topic.to_lowercase()).or_insert(0) += 1;
            }

            total_relevance += record.relevance_score;
            if record.is_degraded() {
                degraded_records += 1;
            }
        }

        let mut top_keywords = ranked(keywords);
        top_keywords.truncate(TOP_TERMS);
        let mut top_topics = ranked(topics);
        top_topics.truncate(TOP_TERMS);

        Self {
            total_records: records.len() as u64,
            degraded_records,
            content_types: ranked(content_types),
            languages: ranked(languages),
            quality: ranked(quality),
            sentiment: ranked(sentiment),
            audiences: ranked(audiences),
            average_relevance: total_relevance / records.len() as f64,
            top_keywords,
            top_topics,
        }
    }

    /// Share of records that were fully analyzed, as a percentage
    pub fn analyzed_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        let analyzed = self.total_records - self.degraded_records;
        (analyzed as f64 / self.total_records as f64) * 100.0
    }
}

/// Sorts counts descending, ties alphabetically
fn ranked(counts: HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut counts: Vec<(String, u64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IndexStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!("  Degraded records: {}", stats.degraded_records);
    println!("  Average relevance: {:.2}", stats.average_relevance);
    println!();

    print_distribution("Content Types", &stats.content_types, stats.total_records);
    print_distribution("Languages", &stats.languages, stats.total_records);
    print_distribution("Content Quality", &stats.quality, stats.total_records);
    print_distribution("Sentiment", &stats.sentiment, stats.total_records);
    print_distribution("Target Audiences", &stats.audiences, stats.total_records);

    if !stats.top_keywords.is_empty() {
        println!("Top Keywords:");
        for (keyword, count) in &stats.top_keywords {
            println!("  {}: {}", keyword, count);
        }
        println!();
    }

    if !stats.top_topics.is_empty() {
        println!("Top Topics:");
        for (topic, count) in &stats.top_topics {
            println!("  {}: {}", topic, count);
        }
        println!();
    }

    println!(
        "Analyzed: {:.1}% ({} / {} records)",
        stats.analyzed_rate(),
        stats.total_records - stats.degraded_records,
        stats.total_records
    );
}

fn print_distribution(label: &str, counts: &[(String, u64)], total: u64) {
    if counts.is_empty() {
        return;
    }
    println!("{}:", label);
    for (value, count) in counts {
        let percentage = if total > 0 {
            (*count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", value, count, percentage);
    }
    println!();
}
