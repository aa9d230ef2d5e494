//! Content analysis boundary
//!
//! The analyzer turns a page's title and text into structured metadata. It is
//! an external, slow and unreliable collaborator, so the pipeline only sees it
//! through the [`ContentAnalyzer`] trait and treats every error the same way:
//! the page still gets a record, built by [`fallback_analysis`].

mod fallback;
mod http;

pub use fallback::{fallback_analysis, fallback_keywords, OfflineAnalyzer};
pub use http::{parse_analysis, HttpAnalyzer};

use crate::config::AnalyzerConfig;
use crate::ConfigError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Placeholder for enrichment fields nobody filled in
pub const UNKNOWN: &str = "unknown";

/// Errors returned by an analyzer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    #[error("analyzer disabled")]
    Disabled,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unparseable response: {0}")]
    Parse(String),
}

impl AnalyzerError {
    /// The error marker stored on a degraded record
    pub fn marker(&self) -> String {
        match self {
            Self::Parse(_) => "JSON parsing failed".to_string(),
            other => format!("Analysis error: {}", other),
        }
    }
}

/// What the analyzer is given for one page
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub url: String,
    pub title: String,
    pub description: String,
    pub text: String,
}

/// Structured metadata produced for one page
///
/// Every field has a default so a partially filled response still parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default, alias = "main_topics")]
    pub topics: Vec<String>,

    #[serde(default = "unknown")]
    pub content_type: String,

    #[serde(default = "unknown")]
    pub language: String,

    #[serde(default = "unknown")]
    pub sentiment: String,

    #[serde(default = "unknown")]
    pub target_audience: String,

    #[serde(default = "unknown")]
    pub content_quality: String,

    #[serde(default)]
    pub relevance_score: f64,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// An enrichment service
///
/// Implementations must fail closed: return an error rather than hang. The
/// pipeline additionally bounds every call with its own timeout.
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, AnalyzerError>;
}

/// Builds the analyzer described by the configuration
///
/// A disabled analyzer becomes an [`OfflineAnalyzer`], which makes every
/// record degraded. An enabled one needs its API key in the environment
/// variable named by `api-key-env`.
pub fn build_analyzer(config: &AnalyzerConfig) -> Result<Arc<dyn ContentAnalyzer>, ConfigError> {
    if !config.enabled {
        tracing::info!("Content analyzer disabled, records will carry fallback metadata");
        return Ok(Arc::new(OfflineAnalyzer));
    }

    let api_key = std::env::var(&config.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(config.api_key_env.clone()))?;

    let analyzer = HttpAnalyzer::new(config, api_key)
        .map_err(|e| ConfigError::Validation(format!("failed to build analyzer client: {}", e)))?;

    tracing::info!("Using analyzer model {} at {}", config.model, config.endpoint);
    Ok(Arc::new(analyzer))
}
