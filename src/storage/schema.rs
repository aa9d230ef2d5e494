//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the indexer database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl and index runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Persisted crawl frontier: every in-domain URL ever discovered
CREATE TABLE IF NOT EXISTS discovered_urls (
    url TEXT PRIMARY KEY,
    seq INTEGER NOT NULL,
    status TEXT NOT NULL,
    error TEXT,
    discovered_at TEXT NOT NULL,
    visited_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_discovered_seq ON discovered_urls(seq);
CREATE INDEX IF NOT EXISTS idx_discovered_status ON discovered_urls(status);

-- Index record repository; list columns hold JSON arrays
CREATE TABLE IF NOT EXISTS index_records (
    url TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    keywords TEXT NOT NULL,
    topics TEXT NOT NULL,
    content_type TEXT NOT NULL,
    language TEXT NOT NULL,
    sentiment TEXT NOT NULL,
    target_audience TEXT NOT NULL,
    content_quality TEXT NOT NULL,
    relevance_score REAL NOT NULL,
    internal_links TEXT NOT NULL,
    word_count INTEGER NOT NULL,
    content_length INTEGER NOT NULL,
    has_meta_description INTEGER NOT NULL,
    indexed_at TEXT NOT NULL,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_records_indexed_at ON index_records(indexed_at);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
