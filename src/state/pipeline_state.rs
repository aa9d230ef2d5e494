//! Per-URL states of the index pipeline
//!
//! ```text
//! Pending -> Fetching -> Extracting -> Analyzing -> Indexed
//!               |            |   \_________________/^
//!               v            v
//!             Failed       Failed
//! ```
//!
//! `Extracting -> Indexed` is the short-content path that skips analysis.

use crate::IndexerError;
use std::fmt;

/// Represents where a URL is in its fetch, extract, analyze traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    // ===== Active States =====
    /// Selected for this run, not yet started
    Pending,

    /// HTTP request in flight
    Fetching,

    /// Parsing the fetched document
    Extracting,

    /// Waiting on the content analyzer
    Analyzing,

    // ===== Terminal States =====
    /// A record (normal or degraded) was produced
    Indexed,

    /// No record: fetch error or no extractable content
    Failed,
}

impl PipelineState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Indexed | Self::Failed)
    }

    /// Returns true if the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Fetching, Extracting)
                | (Fetching, Failed)
                | (Extracting, Analyzing)
                | (Extracting, Indexed)
                | (Extracting, Failed)
                | (Analyzing, Indexed)
                | (Analyzing, Failed)
        )
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow
    pub fn advance(&mut self, next: PipelineState) -> Result<(), IndexerError> {
        if !self.can_transition_to(next) {
            return Err(IndexerError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Analyzing => "analyzing",
            Self::Indexed => "indexed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
