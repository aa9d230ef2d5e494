//! Crawl coordinator - discovery phase orchestration
//!
//! Walks the target domain breadth-first with a bounded pool of fetch
//! workers. Workers only fetch, pace and parse; every frontier mutation and
//! every storage write happens here, on the coordinating task, between worker
//! completions.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::frontier::{CrawlFailure, Frontier};
use crate::crawler::links::discover_links;
use crate::storage::{RunKind, RunStatus, Storage};
use crate::url::{normalize_url, DomainScope};
use crate::IndexerError;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// What the crawl phase produced
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    pub run_id: i64,
    pub seed_url: String,
    /// Every in-domain URL known after the run, in discovery order
    pub discovered_urls: Vec<String>,
    pub visited: usize,
    pub failed: usize,
    /// Discovered but not yet visited, left for a future run
    pub queued: usize,
    /// Pages fetched by this run
    pub pages_this_run: u32,
    pub failure_sample: Vec<CrawlFailure>,
    pub budget_reached: bool,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl DiscoveryReport {
    pub fn discovered(&self) -> usize {
        self.discovered_urls.len()
    }
}

/// Result of one worker's visit
struct Visit {
    url: Url,
    outcome: Result<(), String>,
    links: Vec<Url>,
}

/// Discovery-phase driver
pub struct Crawler {
    seed: Url,
    scope: DomainScope,
    fetcher: Fetcher,
    settings: CrawlerConfig,
    config_hash: String,
}

impl Crawler {
    /// Creates a crawler for the configured target
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    /// * `config_hash` - Stored on the run record
    pub fn new(config: &Config, config_hash: impl Into<String>) -> Result<Self, IndexerError> {
        let seed = normalize_url(&config.target.seed_url)?;
        let scope = DomainScope::from_url(&seed)?;
        let fetcher = Fetcher::new(&config.user_agent, config.crawler.request_timeout())?;

        Ok(Self {
            seed,
            scope,
            fetcher,
            settings: config.crawler.clone(),
            config_hash: config_hash.into(),
        })
    }

    pub fn scope(&self) -> &DomainScope {
        &self.scope
    }

    /// Runs the discovery phase
    ///
    /// 1. Record a crawl run
    /// 2. Restore the persisted frontier, or start from the seed when `fresh`
    ///    is set or nothing is stored
    /// 3. Dispatch queued URLs to at most `max-concurrent` workers until the
    ///    queue is empty, the page budget is spent or `cancel` fires
    /// 4. Checkpoint the frontier every `checkpoint-interval` completions and
    ///    once more at the end
    ///
    /// A failed checkpoint stops the run with an error; per-URL failures never
    /// do.
    pub async fn run(
        &self,
        storage: &mut dyn Storage,
        fresh: bool,
        cancel: CancellationToken,
    ) -> Result<DiscoveryReport, IndexerError> {
        let run_id = storage.create_run(RunKind::Crawl, &self.config_hash)?;
        tracing::info!("Starting crawl run {} from {}", run_id, self.seed);

        match self.crawl(storage, run_id, fresh, cancel).await {
            Ok(report) => {
                let status = if report.cancelled {
                    RunStatus::Interrupted
                } else {
                    RunStatus::Completed
                };
                storage.finish_run(run_id, status)?;
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Crawl run {} failed: {}", run_id, e);
                if let Err(finish_err) = storage.finish_run(run_id, RunStatus::Failed) {
                    tracing::error!("Could not mark run {} as failed: {}", run_id, finish_err);
                }
                Err(e)
            }
        }
    }

    async fn crawl(
        &self,
        storage: &mut dyn Storage,
        run_id: i64,
        fresh: bool,
        cancel: CancellationToken,
    ) -> Result<DiscoveryReport, IndexerError> {
        let start_time = Instant::now();
        let mut frontier = self.load_frontier(storage, fresh)?;
        checkpoint(storage, &mut frontier)?;

        let budget = self.settings.page_budget;
        let max_concurrent = self.settings.max_concurrent.max(1) as usize;
        let checkpoint_interval = self.settings.checkpoint_interval.max(1);

        let mut workers: JoinSet<Visit> = JoinSet::new();
        let mut dispatched: u32 = 0;
        let mut completed: u32 = 0;
        let mut cancelled = false;

        loop {
            while workers.len() < max_concurrent && dispatched < budget {
                let Some(url) = frontier.next() else {
                    break;
                };
                dispatched += 1;
                tracing::debug!("Dispatching ({}/{}): {}", dispatched, budget, url);
                workers.spawn(visit(
                    self.fetcher.clone(),
                    self.scope.clone(),
                    url,
                    self.settings.politeness_delay(),
                    cancel.clone(),
                ));
            }

            if workers.is_empty() {
                break;
            }

            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!("Crawl cancelled, aborting {} in-flight requests", workers.len());
                    workers.shutdown().await;
                    cancelled = true;
                    break;
                }
                joined = workers.join_next() => joined,
            };

            let visit = match joined {
                Some(Ok(visit)) => visit,
                Some(Err(e)) => {
                    // The URL stays queued in storage and is retried on resume
                    tracing::error!("Crawl worker failed: {}", e);
                    continue;
                }
                None => break,
            };

            if let Err(reason) = &visit.outcome {
                tracing::warn!("Failed to fetch {}: {}", visit.url, reason);
            }

            frontier.mark_visited(&visit.url, visit.outcome);
            let new_links = visit
                .links
                .into_iter()
                .filter(|link| frontier.enqueue(link.clone()))
                .count();
            if new_links > 0 {
                tracing::debug!("{} new URLs discovered from {}", new_links, visit.url);
            }

            completed += 1;
            if completed % checkpoint_interval == 0 {
                checkpoint(storage, &mut frontier)?;
                let counts = frontier.counts();
                let rate = completed as f64 / start_time.elapsed().as_secs_f64().max(0.001);
                tracing::info!(
                    "Progress: {} visited, {} queued, {} discovered, {:.2} pages/sec",
                    counts.visited,
                    counts.queued,
                    counts.discovered,
                    rate
                );
            }
        }

        checkpoint(storage, &mut frontier)?;

        let counts = frontier.counts();
        let budget_reached = !cancelled && dispatched >= budget && frontier.has_queued();
        if budget_reached {
            tracing::info!(
                "Page budget of {} reached, {} URLs left for a future run",
                budget,
                counts.queued
            );
        }

        tracing::info!(
            "Crawl run {} finished: {} discovered, {} visited, {} failed in {:?}",
            run_id,
            counts.discovered,
            counts.visited,
            counts.failed,
            start_time.elapsed()
        );

        Ok(DiscoveryReport {
            run_id,
            seed_url: self.seed.to_string(),
            discovered_urls: frontier.discovered_urls().to_vec(),
            visited: counts.visited,
            failed: counts.failed,
            queued: counts.queued,
            pages_this_run: completed,
            failure_sample: frontier.failure_sample(),
            budget_reached,
            cancelled,
            elapsed: start_time.elapsed(),
        })
    }

    fn load_frontier(&self, storage: &mut dyn Storage, fresh: bool) -> Result<Frontier, IndexerError> {
        let mut frontier = if fresh {
            tracing::info!("Fresh crawl requested, clearing stored frontier");
            storage.clear_frontier()?;
            Frontier::new(self.scope.clone())
        } else {
            let entries = storage.load_frontier()?;
            if entries.is_empty() {
                tracing::info!("No stored frontier, starting from the seed");
            } else {
                tracing::info!("Resuming crawl with {} stored URLs", entries.len());
            }
            Frontier::restore(self.scope.clone(), entries)
        };

        frontier.enqueue(self.seed.clone());
        Ok(frontier)
    }
}

/// Fetches one URL, extracts its links and waits out the politeness delay
///
/// The delay runs inside the worker so the slot stays occupied: each worker
/// issues at most one request per delay period. Links are resolved against
/// the URL the page was actually served from.
async fn visit(
    fetcher: Fetcher,
    scope: DomainScope,
    url: Url,
    delay: Duration,
    cancel: CancellationToken,
) -> Visit {
    let result = fetcher.fetch(&url, &scope).await;

    let (outcome, links) = match &result.outcome {
        FetchOutcome::Success { body, .. } => (Ok(()), discover_links(body, &result.final_url)),
        // A reachable non-HTML resource is visited, it just has no links
        FetchOutcome::ContentMismatch { .. } => (Ok(()), Vec::new()),
        failure => (
            Err(failure.failure_reason().unwrap_or_default()),
            Vec::new(),
        ),
    };

    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }

    Visit {
        url,
        outcome,
        links,
    }
}

fn checkpoint(storage: &mut dyn Storage, frontier: &mut Frontier) -> Result<(), IndexerError> {
    let changes = frontier.take_changes();
    if changes.is_empty() {
        return Ok(());
    }
    storage.save_frontier_entries(&changes)?;
    tracing::debug!("Checkpointed {} frontier changes", changes.len());
    Ok(())
}
