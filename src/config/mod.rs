//! Configuration loading for the indexer
//!
//! Configuration is a single TOML file with kebab-case keys. Everything except
//! `[target]`, `[user-agent]` and `[output]` has defaults.
//!
//! # Example
//!
//! ```no_run
//! use site_indexer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("indexer.toml")).unwrap();
//! println!("Batch size: {}", config.indexer.batch_size);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    AnalyzerConfig, Config, CrawlerConfig, ExtractorConfig, IndexerConfig, OutputConfig,
    TargetConfig, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
