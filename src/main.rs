//! Site Indexer main entry point
//!
//! Command-line interface for crawling a site, indexing its pages and
//! searching the resulting repository.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use site_indexer::analyzer::build_analyzer;
use site_indexer::config::{load_config_with_hash, Config};
use site_indexer::crawler::crawl;
use site_indexer::output::{
    export_json, print_discovery_report, print_run_summary, print_search_hits, print_statistics,
    write_markdown_summary, IndexStatistics,
};
use site_indexer::pipeline::{frontier_worklist, index, load_url_list};
use site_indexer::search::{search, SearchFilter, DEFAULT_THRESHOLD};
use site_indexer::storage::{RunKind, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Site Indexer: crawl one site and build a searchable index of its pages
///
/// The crawl phase discovers every in-domain URL reachable from the seed.
/// The index phase fetches each discovered page, extracts its main content,
/// asks the content analyzer for structured metadata and stores one record
/// per page.
#[derive(Parser, Debug)]
#[command(name = "site-indexer")]
#[command(version)]
#[command(about = "Crawl a site and build a searchable index", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and show what would run
    Check,

    /// Discover in-domain URLs, resuming the stored frontier
    Crawl {
        /// Start over, discarding the stored frontier
        #[arg(long)]
        fresh: bool,
    },

    /// Fetch, extract and analyze discovered pages
    Index {
        /// Read URLs from a file (one per line, or CSV with the URL first)
        #[arg(long, value_name = "FILE")]
        urls: Option<PathBuf>,

        /// Replace existing records instead of skipping them
        #[arg(long)]
        reindex: bool,
    },

    /// Fuzzy search over the indexed pages
    Search {
        query: String,

        /// Minimum field similarity (0-100) for a match to count
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: u32,

        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        content_type: Option<String>,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        quality: Option<String>,

        #[arg(long)]
        audience: Option<String>,

        #[arg(long)]
        sentiment: Option<String>,

        #[arg(long)]
        min_relevance: Option<f64>,
    },

    /// Show repository statistics
    Stats,

    /// Write a markdown summary of the repository
    ExportSummary,

    /// Write every index record as JSON
    ExportJson {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Check => handle_check(&config),
        Command::Crawl { fresh } => handle_crawl(&config, &config_hash, fresh).await,
        Command::Index { urls, reindex } => {
            handle_index(&config, &config_hash, urls.as_deref(), reindex).await
        }
        Command::Search {
            query,
            threshold,
            limit,
            content_type,
            language,
            quality,
            audience,
            sentiment,
            min_relevance,
        } => {
            let filter = SearchFilter {
                content_type,
                language,
                content_quality: quality,
                target_audience: audience,
                sentiment,
                min_relevance,
            };
            handle_search(&config, &query, threshold, limit, &filter)
        }
        Command::Stats => handle_stats(&config),
        Command::ExportSummary => handle_export_summary(&config),
        Command::ExportJson { path } => handle_export_json(&config, &path),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_indexer=info,warn"),
            1 => EnvFilter::new("site_indexer=debug,info"),
            2 => EnvFilter::new("site_indexer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_storage(config: &Config) -> anyhow::Result<SqliteStorage> {
    SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open database {}", config.output.database_path))
}

/// Cancels the returned token on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work");
            trigger.cancel();
        }
    });
    token
}

/// Validates config and shows what would run
fn handle_check(config: &Config) -> anyhow::Result<()> {
    println!("=== Site Indexer Check ===\n");

    println!("Target:");
    println!("  Seed URL: {}", config.target.seed_url);

    println!("\nCrawler:");
    println!("  Page budget: {}", config.crawler.page_budget);
    println!("  Concurrent fetches: {}", config.crawler.max_concurrent);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Checkpoint interval: {}", config.crawler.checkpoint_interval);

    println!("\nIndexer:");
    println!("  Concurrent workers: {}", config.indexer.max_concurrent);
    println!("  Batch size: {}", config.indexer.batch_size);
    println!("  Session cap: {}", config.indexer.session_cap);
    println!("  Minimum content: {} chars", config.indexer.min_content_chars);
    println!("  Politeness delay: {}ms", config.indexer.politeness_delay_ms);

    println!("\nAnalyzer:");
    if config.analyzer.enabled {
        println!("  Endpoint: {}", config.analyzer.endpoint);
        println!("  Model: {}", config.analyzer.model);
        let key_present = std::env::var(&config.analyzer.api_key_env).is_ok();
        println!(
            "  API key: ${} ({})",
            config.analyzer.api_key_env,
            if key_present { "set" } else { "missing" }
        );
    } else {
        println!("  Disabled (every page gets a degraded record)");
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

async fn handle_crawl(config: &Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (discarding stored frontier)");
    } else {
        tracing::info!("Starting crawl (resuming stored frontier if any)");
    }

    let mut storage = open_storage(config)?;
    let cancel = cancel_on_ctrl_c();

    let report = crawl(config, config_hash, &mut storage, fresh, cancel)
        .await
        .context("crawl failed")?;

    print_discovery_report(&report);
    Ok(())
}

async fn handle_index(
    config: &Config,
    config_hash: &str,
    url_file: Option<&Path>,
    reindex: bool,
) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;

    let urls = match url_file {
        Some(path) => load_url_list(path)
            .with_context(|| format!("failed to read URL list {}", path.display()))?,
        None => frontier_worklist(&storage.load_frontier()?),
    };
    if urls.is_empty() {
        bail!("no URLs to index; run `crawl` first or pass --urls");
    }
    tracing::info!("Loaded {} URLs to index", urls.len());

    let analyzer =
        build_analyzer(&config.analyzer).context("failed to set up the content analyzer")?;
    tracing::info!("Using analyzer: {}", analyzer.name());

    let cancel = cancel_on_ctrl_c();
    let summary = index(
        config,
        config_hash,
        analyzer,
        &mut storage,
        urls,
        reindex,
        cancel,
    )
    .await
    .context("index run failed")?;

    print_run_summary(&summary);
    Ok(())
}

fn handle_search(
    config: &Config,
    query: &str,
    threshold: u32,
    limit: usize,
    filter: &SearchFilter,
) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let mut records = storage.load_records()?;
    if !filter.is_empty() {
        records.retain(|record| filter.matches(record));
    }

    let mut hits = search(&records, query, threshold);
    hits.truncate(limit);

    print_search_hits(query, &hits);
    Ok(())
}

fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(config)?;
    let records = storage.load_records()?;

    print_statistics(&IndexStatistics::from_records(&records));
    Ok(())
}

fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Index Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let storage = open_storage(config)?;
    let records = storage.load_records()?;
    let last_run = storage.get_latest_run(RunKind::Index)?;

    write_markdown_summary(
        &records,
        last_run.as_ref(),
        Path::new(&config.output.summary_path),
    )
    .context("failed to write summary")?;

    println!("✓ Summary exported to: {}", config.output.summary_path);
    Ok(())
}

fn handle_export_json(config: &Config, path: &Path) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let records = storage.load_records()?;

    export_json(&records, path).with_context(|| format!("failed to write {}", path.display()))?;

    println!("✓ Exported {} records to: {}", records.len(), path.display());
    Ok(())
}
