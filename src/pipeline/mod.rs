//! Index pipeline coordinator
//!
//! Drives the index phase: filters the work list against the repository,
//! applies the session cap, and runs the rest in fixed-size batches. Inside a
//! batch at most `max-concurrent` URLs hold a slot at once; each slot covers a
//! URL's whole traversal. A batch's records are written in one transaction
//! before the next batch is admitted, so a crash or cancellation loses at most
//! the batch in flight.

mod worker;
mod worklist;

pub use worker::{build_record, degraded_record, UrlOutcome, Worker, INSUFFICIENT_CONTENT};
pub use worklist::{frontier_worklist, load_url_list};

use crate::analyzer::ContentAnalyzer;
use crate::config::{Config, IndexerConfig};
use crate::crawler::Fetcher;
use crate::extract::{ContentExtractor, ExtractError};
use crate::state::PipelineState;
use crate::storage::{IndexRecord, RunKind, RunStatus, Storage};
use crate::url::normalize_url;
use crate::IndexerError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Number of failure reasons kept in a run summary
pub const FAILURE_SAMPLE_SIZE: usize = 10;

/// Why a URL ended in `Failed` without a record
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("not HTML: {0}")]
    NotHtml(String),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("invalid state transition {from} -> {to}")]
    Transition {
        from: PipelineState,
        to: PipelineState,
    },

    #[error("worker aborted: {0}")]
    Worker(String),
}

/// A URL that produced no record, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFailure {
    pub url: String,
    pub reason: String,
}

/// Run-end summary of the index phase
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_id: i64,
    /// Distinct URLs handed to the run
    pub candidates: usize,
    /// Already in the repository, not scheduled
    pub skipped: usize,
    /// Scheduled this session (after the session cap)
    pub scheduled: usize,
    /// Records written, degraded ones included
    pub indexed: usize,
    pub degraded: usize,
    pub failed: usize,
    /// Left for a future run by the session cap or a cancellation
    pub remaining: usize,
    pub batches_flushed: usize,
    pub failure_sample: Vec<IndexFailure>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Index-phase driver
pub struct Coordinator {
    settings: IndexerConfig,
    worker: Arc<Worker>,
    config_hash: String,
}

impl Coordinator {
    /// Builds a coordinator from explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Indexer, extractor and user agent settings are read from it
    /// * `analyzer` - The enrichment service; see [`crate::analyzer::build_analyzer`]
    /// * `config_hash` - Stored on the run record
    pub fn new(
        config: &Config,
        analyzer: Arc<dyn ContentAnalyzer>,
        config_hash: impl Into<String>,
    ) -> Result<Self, IndexerError> {
        let fetcher = Fetcher::new(&config.user_agent, config.crawler.request_timeout())?;
        let extractor = ContentExtractor::new(&config.extractor)?;

        let worker = Worker {
            fetcher,
            extractor,
            analyzer,
            analyzer_timeout: config.analyzer.timeout(),
            min_content_chars: config.indexer.min_content_chars,
            politeness_delay: config.indexer.politeness_delay(),
        };

        Ok(Self {
            settings: config.indexer.clone(),
            worker: Arc::new(worker),
            config_hash: config_hash.into(),
        })
    }

    /// Runs the index phase over `urls`
    ///
    /// # Arguments
    ///
    /// * `storage` - Repository and checkpoint
    /// * `urls` - The work list, in the order it should be processed
    /// * `reindex` - Process URLs that already have a record and replace it
    /// * `cancel` - Aborts in-flight work; the current batch is discarded
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run finished, was capped or was cancelled
    /// * `Err(IndexerError)` - A batch could not be persisted; the run stopped
    pub async fn run(
        &self,
        storage: &mut dyn Storage,
        urls: Vec<String>,
        reindex: bool,
        cancel: CancellationToken,
    ) -> Result<RunSummary, IndexerError> {
        let run_id = storage.create_run(RunKind::Index, &self.config_hash)?;
        tracing::info!("Starting index run {} (analyzer: {})", run_id, self.worker.analyzer.name());

        match self.index(storage, run_id, urls, reindex, cancel).await {
            Ok(summary) => {
                let status = if summary.cancelled {
                    RunStatus::Interrupted
                } else {
                    RunStatus::Completed
                };
                storage.finish_run(run_id, status)?;
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("Index run {} failed: {}", run_id, e);
                if let Err(finish_err) = storage.finish_run(run_id, RunStatus::Failed) {
                    tracing::error!("Could not mark run {} as failed: {}", run_id, finish_err);
                }
                Err(e)
            }
        }
    }

    async fn index(
        &self,
        storage: &mut dyn Storage,
        run_id: i64,
        urls: Vec<String>,
        reindex: bool,
        cancel: CancellationToken,
    ) -> Result<RunSummary, IndexerError> {
        let start_time = Instant::now();

        let already_indexed = if reindex {
            HashSet::new()
        } else {
            storage.load_indexed_urls()?
        };

        // Records are keyed by canonical URL; unparsable entries pass through
        // unchanged and fail in their worker
        let mut seen = HashSet::new();
        let candidates: Vec<String> = urls
            .into_iter()
            .map(|u| normalize_url(&u).map(|n| n.to_string()).unwrap_or(u))
            .filter(|u| seen.insert(u.clone()))
            .collect();
        let pending: Vec<String> = candidates
            .iter()
            .filter(|u| !already_indexed.contains(*u))
            .cloned()
            .collect();

        let session_cap = self.settings.session_cap as usize;
        let session: Vec<String> = pending.iter().take(session_cap).cloned().collect();

        let mut summary = RunSummary {
            run_id,
            candidates: candidates.len(),
            skipped: candidates.len() - pending.len(),
            scheduled: session.len(),
            remaining: pending.len(),
            ..RunSummary::default()
        };

        tracing::info!(
            "{} URLs in work list, {} already indexed, {} scheduled this session",
            summary.candidates,
            summary.skipped,
            summary.scheduled
        );

        let batch_size = self.settings.batch_size.max(1) as usize;
        let total_batches = session.len().div_ceil(batch_size);

        for (batch_index, batch) in session.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let Some(outcomes) = self.run_batch(batch, &cancel).await else {
                tracing::warn!(
                    "Index run cancelled during batch {}/{}, {} URLs discarded",
                    batch_index + 1,
                    total_batches,
                    batch.len()
                );
                summary.cancelled = true;
                break;
            };

            let mut records: Vec<IndexRecord> = Vec::with_capacity(outcomes.len());
            let mut batch_failed = 0;
            for outcome in outcomes {
                debug_assert!(outcome.state.is_terminal());
                tracing::debug!("{} ended in {}", outcome.url, outcome.state);
                match outcome.result {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        batch_failed += 1;
                        if summary.failure_sample.len() < FAILURE_SAMPLE_SIZE {
                            summary.failure_sample.push(IndexFailure {
                                url: outcome.url,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }

            // Checkpoint before the next batch is admitted; failure ends the run
            let written = storage.append_records(&records, reindex)?;
            let batch_degraded = records.iter().filter(|r| r.is_degraded()).count();

            summary.indexed += records.len();
            summary.degraded += batch_degraded;
            summary.failed += batch_failed;
            summary.remaining -= batch.len();
            summary.batches_flushed += 1;

            tracing::info!(
                "Batch {}/{} flushed: {} records written ({} degraded), {} failed",
                batch_index + 1,
                total_batches,
                written,
                batch_degraded,
                batch_failed
            );
        }

        summary.elapsed = start_time.elapsed();
        tracing::info!(
            "Index run {} finished: {} indexed, {} degraded, {} failed, {} remaining in {:?}",
            run_id,
            summary.indexed,
            summary.degraded,
            summary.failed,
            summary.remaining,
            summary.elapsed
        );

        Ok(summary)
    }

    /// Runs one batch to completion
    ///
    /// Returns `None` if the run was cancelled; in-flight workers are aborted.
    async fn run_batch(&self, batch: &[String], cancel: &CancellationToken) -> Option<Vec<UrlOutcome>> {
        let gate = Arc::new(Semaphore::new(self.settings.max_concurrent.max(1) as usize));
        let mut workers = JoinSet::new();

        for url in batch {
            let worker = Arc::clone(&self.worker);
            let gate = Arc::clone(&gate);
            let url = url.clone();
            workers.spawn(async move {
                let _slot = gate.acquire_owned().await.ok();
                worker.process(url).await
            });
        }

        let mut outcomes = Vec::with_capacity(batch.len());
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    workers.shutdown().await;
                    return None;
                }
                joined = workers.join_next() => joined,
            };

            match joined {
                Some(Ok(outcome)) => outcomes.push(outcome),
                Some(Err(e)) => {
                    tracing::error!("Index worker aborted: {}", e);
                    outcomes.push(UrlOutcome {
                        url: String::from("<unknown>"),
                        state: PipelineState::Failed,
                        result: Err(PipelineError::Worker(e.to_string())),
                    });
                }
                None => break,
            }
        }

        Some(outcomes)
    }
}

/// Runs a complete index phase
///
/// Convenience wrapper that builds a [`Coordinator`] and runs it once.
pub async fn index(
    config: &Config,
    config_hash: &str,
    analyzer: Arc<dyn ContentAnalyzer>,
    storage: &mut dyn Storage,
    urls: Vec<String>,
    reindex: bool,
    cancel: CancellationToken,
) -> Result<RunSummary, IndexerError> {
    let coordinator = Coordinator::new(config, analyzer, config_hash)?;
    coordinator.run(storage, urls, reindex, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{Analysis, AnalysisRequest, AnalyzerError, UNKNOWN};
    use crate::config::parse_config;
    use crate::state::UrlStatus;
    use crate::storage::{FrontierEntry, RunRecord, SqliteStorage, StorageError, StorageResult};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LONG_TEXT: &str =
        "This page explains how the indexing pipeline handles every page it is given.";

    /// Fails for URLs whose path is listed, succeeds otherwise
    struct ScriptedAnalyzer {
        failing_paths: Vec<&'static str>,
    }

    #[async_trait]
    impl ContentAnalyzer for ScriptedAnalyzer {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, AnalyzerError> {
            if self.failing_paths.iter().any(|p| request.url.ends_with(p)) {
                return Err(AnalyzerError::Connection("scripted failure".to_string()));
            }
            Ok(Analysis {
                keywords: vec!["pipeline".to_string()],
                description: format!("Analysis of {}", request.title),
                topics: vec!["indexing".to_string()],
                content_type: "documentation".to_string(),
                language: "en".to_string(),
                sentiment: "neutral".to_string(),
                target_audience: "technical".to_string(),
                content_quality: "high".to_string(),
                relevance_score: 0.8,
            })
        }
    }

    fn test_config(seed: &str, batch_size: u32, session_cap: u32) -> Config {
        let toml = format!(
            r#"
[target]
seed-url = "{seed}"

[crawler]
request-timeout-secs = 5

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[indexer]
max-concurrent = 2
batch-size = {batch_size}
session-cap = {session_cap}
min-content-chars = 50
politeness-delay-ms = 0

[analyzer]
enabled = false

[output]
database-path = "./unused.db"
summary-path = "./unused.md"
"#
        );
        parse_config(&toml).unwrap()
    }

    fn page_html(title: &str) -> String {
        format!(
            "<html><head><title>{}</title></head><body><main><p>{}</p></main></body></html>",
            title, LONG_TEXT
        )
    }

    async fn mount_page(server: &MockServer, p: &str, html: String) {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
            .mount(server)
            .await;
    }

    fn coordinator(config: &Config, failing_paths: Vec<&'static str>) -> Coordinator {
        Coordinator::new(config, Arc::new(ScriptedAnalyzer { failing_paths }), "hash").unwrap()
    }

    #[tokio::test]
    async fn test_records_and_failures() {
        let server = MockServer::start().await;
        mount_page(&server, "/ok", page_html("Ok")).await;
        mount_page(&server, "/short", "<main>tiny</main>".to_string()).await;
        mount_page(&server, "/empty", "<html><body><nav>menu</nav></body></html>".to_string()).await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let config = test_config(&format!("{}/", server.uri()), 10, 100);
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let urls = ["/ok", "/short", "/empty", "/gone"]
            .iter()
            .map(|p| format!("{}{}", server.uri(), p))
            .collect();

        let summary = coordinator(&config, vec![])
            .run(&mut storage, urls, false, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failure_sample.len(), 2);

        let ok = storage
            .get_record(&format!("{}/ok", server.uri()))
            .unwrap()
            .unwrap();
        assert_eq!(ok.title, "Ok");
        assert_eq!(ok.description, "Analysis of Ok");
        assert!(!ok.is_degraded());

        let short = storage
            .get_record(&format!("{}/short", server.uri()))
            .unwrap()
            .unwrap();
        assert_eq!(short.error.as_deref(), Some(INSUFFICIENT_CONTENT));
        assert_eq!(short.content_type, UNKNOWN);

        assert!(storage
            .get_record(&format!("{}/gone", server.uri()))
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_analyzer_failure_yields_degraded_record() {
        let server = MockServer::start().await;
        for p in ["/1", "/2", "/3", "/4", "/5"] {
            mount_page(&server, p, page_html(&format!("Page {}", p))).await;
        }

        let config = test_config(&format!("{}/", server.uri()), 2, 100);
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let urls = (1..=5).map(|i| format!("{}/{}", server.uri(), i)).collect();

        let summary = coordinator(&config, vec!["/3"])
            .run(&mut storage, urls, false, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.indexed, 5);
        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.batches_flushed, 3);

        let degraded = storage
            .get_record(&format!("{}/3", server.uri()))
            .unwrap()
            .unwrap();
        assert_eq!(
            degraded.error.as_deref(),
            Some("Analysis error: connection failed: scripted failure")
        );
        assert_eq!(storage.count_degraded_records().unwrap(), 1);
        assert_eq!(storage.count_records().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_second_run_skips_indexed_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page_html("A"), "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&format!("{}/", server.uri()), 10, 100);
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let urls = vec![format!("{}/a", server.uri())];
        let coordinator = coordinator(&config, vec![]);

        let first = coordinator
            .run(&mut storage, urls.clone(), false, CancellationToken::new())
            .await
            .unwrap();
        let second = coordinator
            .run(&mut storage, urls, false, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(first.indexed, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.scheduled, 0);
        assert_eq!(second.indexed, 0);
        assert_eq!(storage.count_records().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_session_cap_leaves_remaining() {
        let server = MockServer::start().await;
        for p in ["/1", "/2", "/3"] {
            mount_page(&server, p, page_html("Capped")).await;
        }

        let config = test_config(&format!("{}/", server.uri()), 10, 2);
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let urls: Vec<String> = (1..=3).map(|i| format!("{}/{}", server.uri(), i)).collect();
        let coordinator = coordinator(&config, vec![]);

        let first = coordinator
            .run(&mut storage, urls.clone(), false, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first.scheduled, 2);
        assert_eq!(first.remaining, 1);

        let second = coordinator
            .run(&mut storage, urls, false, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(second.skipped, 2);
        assert_eq!(second.indexed, 1);
        assert_eq!(second.remaining, 0);
        assert_eq!(storage.count_records().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reindex_replaces_records() {
        let server = MockServer::start().await;
        mount_page(&server, "/a", page_html("A")).await;

        let config = test_config(&format!("{}/", server.uri()), 10, 100);
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url = format!("{}/a", server.uri());

        coordinator(&config, vec!["/a"])
            .run(&mut storage, vec![url.clone()], false, CancellationToken::new())
            .await
            .unwrap();
        assert!(storage.get_record(&url).unwrap().unwrap().is_degraded());

        let summary = coordinator(&config, vec![])
            .run(&mut storage, vec![url.clone()], true, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.skipped, 0);
        assert!(!storage.get_record(&url).unwrap().unwrap().is_degraded());
        assert_eq!(storage.count_records().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing() {
        let server = MockServer::start().await;
        mount_page(&server, "/a", page_html("A")).await;

        let config = test_config(&format!("{}/", server.uri()), 10, 100);
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = coordinator(&config, vec![])
            .run(&mut storage, vec![format!("{}/a", server.uri())], false, cancel)
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.remaining, 1);
        assert_eq!(storage.count_records().unwrap(), 0);
        let run = storage.get_run(summary.run_id).unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
    }

    #[tokio::test]
    async fn test_off_site_redirect_fails_without_record() {
        let server = MockServer::start().await;
        let elsewhere = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page_html("Off"), "text/html"))
            .expect(0)
            .mount(&elsewhere)
            .await;
        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/landing", elsewhere.uri()).as_str()),
            )
            .mount(&server)
            .await;

        let config = test_config(&format!("{}/", server.uri()), 10, 100);
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url = format!("{}/moved", server.uri());

        let summary = coordinator(&config, vec![])
            .run(&mut storage, vec![url.clone()], false, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.indexed, 0);
        assert_eq!(summary.failed, 1);
        assert!(summary.failure_sample[0].reason.contains("redirected off-site"));
        assert!(storage.get_record(&url).unwrap().is_none());
    }

    /// SQLite storage whose record writes always fail
    struct FailingAppendStorage {
        inner: SqliteStorage,
    }

    impl Storage for FailingAppendStorage {
        fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
            self.inner.create_run(kind, config_hash)
        }

        fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
            self.inner.get_run(run_id)
        }

        fn get_latest_run(&self, kind: RunKind) -> StorageResult<Option<RunRecord>> {
            self.inner.get_latest_run(kind)
        }

        fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
            self.inner.finish_run(run_id, status)
        }

        fn save_frontier_entries(&mut self, entries: &[FrontierEntry]) -> StorageResult<()> {
            self.inner.save_frontier_entries(entries)
        }

        fn load_frontier(&self) -> StorageResult<Vec<FrontierEntry>> {
            self.inner.load_frontier()
        }

        fn clear_frontier(&mut self) -> StorageResult<()> {
            self.inner.clear_frontier()
        }

        fn count_frontier_by_status(&self, status: UrlStatus) -> StorageResult<u64> {
            self.inner.count_frontier_by_status(status)
        }

        fn load_indexed_urls(&self) -> StorageResult<HashSet<String>> {
            self.inner.load_indexed_urls()
        }

        fn append_records(&mut self, _records: &[IndexRecord], _overwrite: bool) -> StorageResult<usize> {
            Err(StorageError::Serialization("disk full".to_string()))
        }

        fn load_records(&self) -> StorageResult<Vec<IndexRecord>> {
            self.inner.load_records()
        }

        fn get_record(&self, url: &str) -> StorageResult<Option<IndexRecord>> {
            self.inner.get_record(url)
        }

        fn count_records(&self) -> StorageResult<u64> {
            self.inner.count_records()
        }

        fn count_degraded_records(&self) -> StorageResult<u64> {
            self.inner.count_degraded_records()
        }
    }

    #[tokio::test]
    async fn test_failed_batch_write_stops_the_run() {
        let server = MockServer::start().await;
        for (p, calls) in [("/1", 1), ("/2", 1), ("/3", 0), ("/4", 0)] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(200).set_body_raw(page_html(p), "text/html"))
                .expect(calls)
                .mount(&server)
                .await;
        }

        let config = test_config(&format!("{}/", server.uri()), 2, 100);
        let mut storage = FailingAppendStorage {
            inner: SqliteStorage::new_in_memory().unwrap(),
        };
        let urls = (1..=4).map(|i| format!("{}/{}", server.uri(), i)).collect();

        let err = coordinator(&config, vec![])
            .run(&mut storage, urls, false, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IndexerError::Storage(StorageError::Serialization(_))
        ));

        let run = storage.get_latest_run(RunKind::Index).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.finished_at.is_some());
        assert_eq!(storage.count_records().unwrap(), 0);
    }
}
