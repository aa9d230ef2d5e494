use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the indexer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    pub output: OutputConfig,
}

/// The site being indexed
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// First URL of the crawl; its host (and port) defines the domain scope
    #[serde(rename = "seed-url")]
    pub seed_url: String,
}

/// Crawl phase configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages fetched in one crawl run
    #[serde(rename = "page-budget", default = "default_page_budget")]
    pub page_budget: u32,

    /// Number of concurrent fetch workers
    #[serde(rename = "max-concurrent", default = "default_crawler_concurrency")]
    pub max_concurrent: u32,

    /// Pause each worker takes after its own fetch (milliseconds).
    ///
    /// This is per-worker pacing, not a global limiter: the pool issues
    /// roughly `max-concurrent` requests per delay period.
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of completed visits between frontier checkpoints
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_budget: default_page_budget(),
            max_concurrent: default_crawler_concurrency(),
            politeness_delay_ms: default_politeness_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Index phase configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    /// Maximum number of URLs in flight at once
    #[serde(rename = "max-concurrent", default = "default_indexer_concurrency")]
    pub max_concurrent: u32,

    /// URLs per batch; each batch is flushed before the next starts
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Maximum number of URLs processed in one run
    #[serde(rename = "session-cap", default = "default_session_cap")]
    pub session_cap: u32,

    /// Pages with less text than this skip analysis and get a degraded record
    #[serde(rename = "min-content-chars", default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Pause each worker takes after its fetch (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,
}

impl IndexerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_indexer_concurrency(),
            batch_size: default_batch_size(),
            session_cap: default_session_cap(),
            min_content_chars: default_min_content_chars(),
            politeness_delay_ms: default_politeness_delay_ms(),
        }
    }
}

/// Content extraction heuristics
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Main text is truncated to this many characters
    #[serde(rename = "max-content-chars", default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Maximum internal links kept per page
    #[serde(rename = "max-links", default = "default_max_links")]
    pub max_links: usize,

    /// Elements dropped before any text or link is collected, in order
    #[serde(rename = "remove-selectors", default = "default_remove_selectors")]
    pub remove_selectors: Vec<String>,

    /// Main-region candidates, tried in order before falling back to `body`
    #[serde(rename = "content-selectors", default = "default_content_selectors")]
    pub content_selectors: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_content_chars: default_max_content_chars(),
            max_links: default_max_links(),
            remove_selectors: default_remove_selectors(),
            content_selectors: default_content_selectors(),
        }
    }
}

/// Content analyzer (OpenAI-compatible chat completions endpoint)
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// When false every page gets a degraded record
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the API; `/chat/completions` is appended
    #[serde(default = "default_analyzer_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_analyzer_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    /// Upper bound on one analysis call (seconds)
    #[serde(rename = "timeout-secs", default = "default_analyzer_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(rename = "max-tokens", default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl AnalyzerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_analyzer_endpoint(),
            model: default_analyzer_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_analyzer_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

fn default_page_budget() -> u32 {
    10_000
}

fn default_crawler_concurrency() -> u32 {
    4
}

fn default_politeness_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_checkpoint_interval() -> u32 {
    25
}

fn default_indexer_concurrency() -> u32 {
    3
}

fn default_batch_size() -> u32 {
    10
}

fn default_session_cap() -> u32 {
    400
}

fn default_min_content_chars() -> usize {
    50
}

fn default_max_content_chars() -> usize {
    8000
}

fn default_max_links() -> usize {
    20
}

pub(crate) fn default_remove_selectors() -> Vec<String> {
    [
        "script",
        "style",
        "noscript",
        "nav",
        "header",
        "footer",
        "aside",
        ".sidebar",
        ".navigation",
        ".menu",
        ".breadcrumb",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub(crate) fn default_content_selectors() -> Vec<String> {
    [
        "main",
        "article",
        "[role=\"main\"]",
        ".content",
        "#content",
        ".main-content",
        ".post-content",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_analyzer_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_analyzer_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_analyzer_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    800
}
