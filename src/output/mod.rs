//! Output module for reports, statistics and exports
//!
//! This module handles:
//! - Console reports for crawl runs, index runs and searches
//! - Repository statistics
//! - Markdown summary and JSON export of the index records

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use report::{print_discovery_report, print_run_summary, print_search_hits};
pub use stats::{print_statistics, IndexStatistics};

use crate::storage::IndexRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes every record to `output_path` as a pretty-printed JSON array
pub fn export_json(records: &[IndexRecord], output_path: &Path) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
