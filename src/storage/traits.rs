//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::UrlStatus;
use crate::storage::{FrontierEntry, IndexRecord, RunKind, RunRecord, RunStatus};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every write that a phase depends on for resume (frontier checkpoints,
/// record batches) is atomic: it either lands completely or returns an error.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run and returns its ID
    ///
    /// # Arguments
    ///
    /// * `kind` - Which phase the run belongs to
    /// * `config_hash` - Hash of the configuration file
    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run of the given kind
    fn get_latest_run(&self, kind: RunKind) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Frontier Management =====

    /// Inserts or updates frontier entries in one transaction
    ///
    /// An existing URL keeps its original discovery sequence number.
    fn save_frontier_entries(&mut self, entries: &[FrontierEntry]) -> StorageResult<()>;

    /// Loads the whole frontier in discovery order
    fn load_frontier(&self) -> StorageResult<Vec<FrontierEntry>>;

    /// Deletes every frontier entry
    fn clear_frontier(&mut self) -> StorageResult<()>;

    /// Counts frontier entries with the given status
    fn count_frontier_by_status(&self, status: UrlStatus) -> StorageResult<u64>;

    // ===== Index Records =====

    /// Loads the set of URLs already present in the repository
    ///
    /// This is the index checkpoint: the pipeline skips these URLs on startup.
    fn load_indexed_urls(&self) -> StorageResult<HashSet<String>>;

    /// Appends a batch of records in one transaction
    ///
    /// # Arguments
    ///
    /// * `records` - The batch to persist
    /// * `overwrite` - Replace existing records with the same URL (re-index).
    ///   When false an existing record is left untouched.
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn append_records(&mut self, records: &[IndexRecord], overwrite: bool)
        -> StorageResult<usize>;

    /// Loads all records ordered by indexing time
    fn load_records(&self) -> StorageResult<Vec<IndexRecord>>;

    /// Gets a record by URL
    fn get_record(&self, url: &str) -> StorageResult<Option<IndexRecord>>;

    // ===== Statistics =====

    /// Counts all records
    fn count_records(&self) -> StorageResult<u64>;

    /// Counts records carrying an error marker
    fn count_degraded_records(&self) -> StorageResult<u64>;
}
