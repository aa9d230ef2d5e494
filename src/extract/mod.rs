//! Content extraction from fetched HTML
//!
//! Turns a raw document into an [`ExtractedPage`]: title, meta description,
//! the cleaned text of the main content region and the internal links found
//! inside that region. Links in navigation, headers and footers are excluded
//! on purpose, since they repeat on every page.

mod extractor;
mod heuristics;

pub use extractor::ContentExtractor;
pub use heuristics::{Heuristic, HeuristicList};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the extractor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Neither a candidate region nor the body holds any text
    #[error("no content")]
    NoContent,

    #[error("invalid selector {0}")]
    InvalidSelector(String),
}

/// An internal link found in the main content region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub url: String,
    pub text: String,
}

/// The extracted, size-capped content of one page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Whitespace-collapsed main text, truncated to the configured cap
    pub text: String,
    pub links: Vec<PageLink>,
    /// Name of the heuristic that selected the main region
    pub region: String,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractedPage {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
