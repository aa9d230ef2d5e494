//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::UrlStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{FrontierEntry, IndexRecord, RunKind, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;

const RECORD_COLUMNS: &str = "url, title, description, keywords, topics, content_type, \
     language, sentiment, target_audience, content_quality, relevance_score, internal_links, \
     word_count, content_length, has_meta_description, indexed_at, error";

const RECORD_PLACEHOLDERS: &str =
    "?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and applies the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        kind: RunKind::from_db_string(&row.get::<_, String>(1)?).unwrap_or(RunKind::Crawl),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<IndexRecord> {
    Ok(IndexRecord {
        url: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        keywords: json_column(row, 3)?,
        topics: json_column(row, 4)?,
        content_type: row.get(5)?,
        language: row.get(6)?,
        sentiment: row.get(7)?,
        target_audience: row.get(8)?,
        content_quality: row.get(9)?,
        relevance_score: row.get(10)?,
        internal_links: json_column(row, 11)?,
        word_count: row.get(12)?,
        content_length: row.get(13)?,
        has_meta_description: row.get(14)?,
        indexed_at: timestamp_column(row, 15)?,
        error: row.get(16)?,
    })
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (kind, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, kind, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self, kind: RunKind) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, kind, started_at, finished_at, config_hash, status FROM runs
                 WHERE kind = ?1 ORDER BY id DESC LIMIT 1",
                params![kind.to_db_string()],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Frontier Management =====

    fn save_frontier_entries(&mut self, entries: &[FrontierEntry]) -> StorageResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO discovered_urls (url, seq, status, error, discovered_at, visited_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(url) DO UPDATE SET
                     status = excluded.status,
                     error = excluded.error,
                     visited_at = COALESCE(excluded.visited_at, discovered_urls.visited_at)",
            )?;

            for entry in entries {
                let visited_at = entry.status.is_visited().then(|| now.clone());
                stmt.execute(params![
                    entry.url,
                    entry.seq as i64,
                    entry.status.to_db_string(),
                    entry.error,
                    now,
                    visited_at,
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn load_frontier(&self) -> StorageResult<Vec<FrontierEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, seq, status, error FROM discovered_urls ORDER BY seq ASC")?;

        let entries = stmt
            .query_map([], |row| {
                Ok(FrontierEntry {
                    url: row.get(0)?,
                    seq: row.get::<_, i64>(1)? as u64,
                    status: UrlStatus::from_db_string(&row.get::<_, String>(2)?)
                        .unwrap_or(UrlStatus::Queued),
                    error: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn clear_frontier(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM discovered_urls", [])?;
        Ok(())
    }

    fn count_frontier_by_status(&self, status: UrlStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM discovered_urls WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Index Records =====

    fn load_indexed_urls(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM index_records")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(urls)
    }

    fn append_records(
        &mut self,
        records: &[IndexRecord],
        overwrite: bool,
    ) -> StorageResult<usize> {
        let verb = if overwrite {
            "INSERT OR REPLACE"
        } else {
            "INSERT OR IGNORE"
        };
        let sql = format!(
            "{} INTO index_records ({}) VALUES ({})",
            verb, RECORD_COLUMNS, RECORD_PLACEHOLDERS
        );

        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                written += stmt.execute(params![
                    record.url,
                    record.title,
                    record.description,
                    serde_json::to_string(&record.keywords)?,
                    serde_json::to_string(&record.topics)?,
                    record.content_type,
                    record.language,
                    record.sentiment,
                    record.target_audience,
                    record.content_quality,
                    record.relevance_score,
                    serde_json::to_string(&record.internal_links)?,
                    record.word_count,
                    record.content_length,
                    record.has_meta_description,
                    record.indexed_at.to_rfc3339(),
                    record.error,
                ])?;
            }
        }
        tx.commit()?;

        Ok(written)
    }

    fn load_records(&self) -> StorageResult<Vec<IndexRecord>> {
        let sql = format!(
            "SELECT {} FROM index_records ORDER BY indexed_at ASC, url ASC",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn get_record(&self, url: &str) -> StorageResult<Option<IndexRecord>> {
        let sql = format!("SELECT {} FROM index_records WHERE url = ?1", RECORD_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, params![url], record_from_row)
            .optional()?;
        Ok(record)
    }

    // ===== Statistics =====

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM index_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_degraded_records(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM index_records WHERE error IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
