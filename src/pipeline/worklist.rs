//! Building the index phase's work list
//!
//! The two phases only share a list of URLs. It comes either from the stored
//! crawl frontier or from a plain file (one URL per line, or a CSV whose first
//! column is the URL).

use crate::state::UrlStatus;
use crate::storage::FrontierEntry;
use crate::url::{is_skipped_link, normalize_url};
use crate::IndexerError;
use std::collections::HashSet;
use std::path::Path;

/// Work list from the crawl frontier, in discovery order
///
/// URLs whose fetch failed during the crawl are left out; visited and
/// still-queued URLs are both included.
pub fn frontier_worklist(entries: &[FrontierEntry]) -> Vec<String> {
    let mut entries: Vec<&FrontierEntry> = entries.iter().collect();
    entries.sort_by_key(|e| e.seq);

    entries
        .into_iter()
        .filter(|e| e.status != UrlStatus::Failed)
        .filter(|e| !is_skipped_link(&e.url))
        .map(|e| e.url.clone())
        .collect()
}

/// Reads a URL list file
///
/// Takes the first comma-separated column of each line. Header rows, blank
/// lines, invalid URLs and system endpoints are skipped; duplicates keep their
/// first position.
pub fn load_url_list(path: &Path) -> Result<Vec<String>, IndexerError> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_url_list(&content))
}

fn parse_url_list(content: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::info!("Skipping unreadable row {}: {}", index + 1, e);
                continue;
            }
        };
        let line = record.position().map_or(index as u64 + 1, |p| p.line());

        let first_column = record.get(0).unwrap_or_default();
        if first_column.is_empty() {
            continue;
        }

        if is_skipped_link(first_column) {
            tracing::debug!("Skipping system URL on line {}: {}", line, first_column);
            continue;
        }

        match normalize_url(first_column) {
            Ok(url) => {
                let url = url.to_string();
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            Err(_) if index == 0 => {
                // Header row
            }
            Err(e) => {
                tracing::info!("Skipping invalid URL on line {}: {} ({})", line, first_column, e);
            }
        }
    }

    urls
}
