//! Breadth-first crawl frontier
//!
//! The frontier owns every piece of crawl bookkeeping: the FIFO queue, the
//! `discovered` set that acts as the single dedupe gate, the `visited` set and
//! the list of failures. It is only ever mutated by the crawl coordinator, so
//! it needs no locking.
//!
//! ```text
//!   enqueue ──► discovered? ──no──► queued ──next()──► in flight
//!                   │yes                                   │
//!                   ▼                                      ▼
//!                 drop                       mark_visited(ok | err)
//!                                                          │
//!                                                          ▼
//!                                                  visited (+ failed)
//! ```

use crate::state::UrlStatus;
use crate::storage::FrontierEntry;
use crate::url::DomainScope;
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

/// Number of failures kept in a report
pub const FAILURE_SAMPLE_SIZE: usize = 10;

/// A fetch failure recorded during the crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlFailure {
    pub url: String,
    pub reason: String,
}

/// Snapshot of crawl progress
#[derive(Debug, Clone, Default)]
pub struct FrontierCounts {
    pub discovered: usize,
    pub visited: usize,
    pub failed: usize,
    pub queued: usize,
}

#[derive(Debug)]
pub struct Frontier {
    scope: DomainScope,
    queue: VecDeque<Url>,
    /// Every discovered URL with its discovery sequence number
    discovered: HashMap<String, u64>,
    order: Vec<String>,
    visited: HashSet<String>,
    failed: Vec<CrawlFailure>,
    next_seq: u64,
    /// Entries changed since the last `take_changes`
    changes: Vec<FrontierEntry>,
}

impl Frontier {
    /// Creates an empty frontier restricted to `scope`
    pub fn new(scope: DomainScope) -> Self {
        Self {
            scope,
            queue: VecDeque::new(),
            discovered: HashMap::new(),
            order: Vec::new(),
            visited: HashSet::new(),
            failed: Vec::new(),
            next_seq: 0,
            changes: Vec::new(),
        }
    }

    /// Rebuilds a frontier from persisted entries
    ///
    /// Visited and failed entries stay visited. Queued entries go back on the
    /// queue in discovery order, including URLs that were in flight when the
    /// previous run stopped.
    pub fn restore(scope: DomainScope, mut entries: Vec<FrontierEntry>) -> Self {
        entries.sort_by_key(|e| e.seq);

        let mut frontier = Self::new(scope);

        for entry in entries {
            frontier.next_seq = frontier.next_seq.max(entry.seq + 1);

            if frontier.discovered.contains_key(&entry.url) {
                continue;
            }
            frontier.discovered.insert(entry.url.clone(), entry.seq);
            frontier.order.push(entry.url.clone());

            match entry.status {
                UrlStatus::Queued => match Url::parse(&entry.url) {
                    Ok(url) => frontier.queue.push_back(url),
                    Err(e) => {
                        tracing::warn!("Dropping unparsable frontier entry {}: {}", entry.url, e);
                    }
                },
                UrlStatus::Visited => {
                    frontier.visited.insert(entry.url);
                }
                UrlStatus::Failed => {
                    frontier.visited.insert(entry.url.clone());
                    frontier.failed.push(CrawlFailure {
                        url: entry.url,
                        reason: entry.error.unwrap_or_default(),
                    });
                }
            }
        }

        frontier
    }

    /// Returns true if the URL belongs to the crawl target
    pub fn is_in_domain(&self, url: &Url) -> bool {
        self.scope.contains(url)
    }

    /// Adds a URL to the queue unless it was already discovered
    ///
    /// Out-of-domain URLs are dropped without being recorded.
    ///
    /// # Returns
    ///
    /// `true` if the URL was newly discovered
    pub fn enqueue(&mut self, url: Url) -> bool {
        if !self.is_in_domain(&url) {
            return false;
        }

        let key = url.to_string();
        if self.discovered.contains_key(&key) {
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.discovered.insert(key.clone(), seq);

        self.order.push(key.clone());
        self.changes.push(FrontierEntry {
            url: key,
            seq,
            status: UrlStatus::Queued,
            error: None,
        });
        self.queue.push_back(url);

        true
    }

    /// Pops the oldest queued URL
    pub fn next(&mut self) -> Option<Url> {
        self.queue.pop_front()
    }

    /// Records the outcome of visiting a URL
    ///
    /// A failed URL still counts as visited and is never retried.
    pub fn mark_visited(&mut self, url: &Url, outcome: Result<(), String>) {
        let key = url.to_string();
        if !self.visited.insert(key.clone()) {
            return;
        }

        let seq = match self.discovered.get(&key) {
            Some(seq) => *seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.discovered.insert(key.clone(), seq);
                self.order.push(key.clone());
                seq
            }
        };
        let (status, error) = match outcome {
            Ok(()) => (UrlStatus::Visited, None),
            Err(reason) => {
                self.failed.push(CrawlFailure {
                    url: key.clone(),
                    reason: reason.clone(),
                });
                (UrlStatus::Failed, Some(reason))
            }
        };

        self.changes.push(FrontierEntry {
            url: key,
            seq,
            status,
            error,
        });
    }

    /// Drains the entries changed since the previous call
    pub fn take_changes(&mut self) -> Vec<FrontierEntry> {
        std::mem::take(&mut self.changes)
    }

    pub fn has_queued(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn is_discovered(&self, url: &Url) -> bool {
        self.discovered.contains_key(url.as_str())
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Every discovered URL in discovery order
    pub fn discovered_urls(&self) -> &[String] {
        &self.order
    }

    pub fn failures(&self) -> &[CrawlFailure] {
        &self.failed
    }

    pub fn counts(&self) -> FrontierCounts {
        FrontierCounts {
            discovered: self.discovered.len(),
            visited: self.visited.len(),
            failed: self.failed.len(),
            queued: self.queue.len(),
        }
    }

    /// The first few failures, for reporting
    pub fn failure_sample(&self) -> Vec<CrawlFailure> {
        self.failed
            .iter()
            .take(FAILURE_SAMPLE_SIZE)
            .cloned()
            .collect()
    }
}
