//! Crawler module for the discovery phase
//!
//! This module contains the crawl logic, including:
//! - The breadth-first frontier and its dedupe bookkeeping
//! - HTTP fetching with structured outcomes
//! - Whole-page link discovery
//! - Bounded-concurrency crawl coordination with frontier checkpoints

mod discovery;
mod fetcher;
mod frontier;
mod links;

pub use discovery::{Crawler, DiscoveryReport};
pub use fetcher::{FetchOutcome, FetchResult, Fetcher};
pub use frontier::{CrawlFailure, Frontier, FrontierCounts, FAILURE_SAMPLE_SIZE};
pub use links::discover_links;

use crate::config::Config;
use crate::storage::Storage;
use crate::IndexerError;
use tokio_util::sync::CancellationToken;

/// Runs a complete discovery phase
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `config_hash` - Hash of the configuration file, stored on the run
/// * `storage` - Where the frontier is restored from and checkpointed to
/// * `fresh` - Discard the stored frontier and start from the seed
/// * `cancel` - Stops the crawl; the frontier is still checkpointed
///
/// # Example
///
/// ```no_run
/// use site_indexer::config::load_config_with_hash;
/// use site_indexer::crawler::crawl;
/// use site_indexer::storage::SqliteStorage;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
/// let report = crawl(&config, &hash, &mut storage, false, CancellationToken::new()).await?;
/// println!("{} URLs discovered", report.discovered());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    config: &Config,
    config_hash: &str,
    storage: &mut dyn Storage,
    fresh: bool,
    cancel: CancellationToken,
) -> Result<DiscoveryReport, IndexerError> {
    let crawler = Crawler::new(config, config_hash)?;
    crawler.run(storage, fresh, cancel).await
}
