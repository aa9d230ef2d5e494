//! Storage module for persisting crawl and index data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run tracking for both phases
//! - The persisted crawl frontier (discovered URLs and their status)
//! - The index record repository, which doubles as the index checkpoint

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::extract::PageLink;
use crate::state::UrlStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One searchable page in the repository
///
/// Created once per URL. Only an explicit re-index replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub topics: Vec<String>,
    pub content_type: String,
    pub language: String,
    pub sentiment: String,
    pub target_audience: String,
    pub content_quality: String,
    pub relevance_score: f64,
    pub internal_links: Vec<PageLink>,
    pub word_count: u32,
    pub content_length: u32,
    pub has_meta_description: bool,
    pub indexed_at: DateTime<Utc>,
    /// Set when analysis failed and the enrichment fields are placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexRecord {
    /// Returns true for records produced without a successful analysis
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// A URL in the persisted crawl frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    /// Discovery order, unique within the frontier
    pub seq: u64,
    pub status: UrlStatus,
    pub error: Option<String>,
}

/// Represents a crawl or index run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub kind: RunKind,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Which phase a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Crawl,
    Index,
}

impl RunKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Index => "index",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "crawl" => Some(Self::Crawl),
            "index" => Some(Self::Index),
            _ => None,
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
