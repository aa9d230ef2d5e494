use crate::config::types::{
    AnalyzerConfig, Config, CrawlerConfig, ExtractorConfig, IndexerConfig, OutputConfig,
    TargetConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Upper bound on any politeness delay (milliseconds)
const MAX_POLITENESS_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_indexer_config(&config.indexer)?;
    validate_extractor_config(&config.extractor)?;
    validate_analyzer_config(&config.analyzer)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.seed_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed_url '{}': {}", config.seed_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "seed_url '{}' must use http or https",
            config.seed_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::Validation(format!(
            "seed_url '{}' has no host",
            config.seed_url
        )));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_concurrency("crawler.max_concurrent", config.max_concurrent)?;

    if config.page_budget < 1 {
        return Err(ConfigError::Validation(format!(
            "page_budget must be >= 1, got {}",
            config.page_budget
        )));
    }

    validate_delay("crawler.politeness_delay_ms", config.politeness_delay_ms)?;

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    Ok(())
}

fn validate_indexer_config(config: &IndexerConfig) -> Result<(), ConfigError> {
    validate_concurrency("indexer.max_concurrent", config.max_concurrent)?;

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.session_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "session_cap must be >= 1, got {}",
            config.session_cap
        )));
    }

    validate_delay("indexer.politeness_delay_ms", config.politeness_delay_ms)?;

    Ok(())
}

fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    if config.max_content_chars < 1 {
        return Err(ConfigError::Validation(
            "max_content_chars must be >= 1".to_string(),
        ));
    }

    if config.max_links < 1 {
        return Err(ConfigError::Validation("max_links must be >= 1".to_string()));
    }

    for selector in config
        .remove_selectors
        .iter()
        .chain(config.content_selectors.iter())
    {
        Selector::parse(selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
    }

    Ok(())
}

fn validate_analyzer_config(config: &AnalyzerConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid analyzer endpoint: {}", e)))?;

    if config.model.is_empty() {
        return Err(ConfigError::Validation(
            "analyzer model cannot be empty".to_string(),
        ));
    }

    if config.api_key_env.is_empty() {
        return Err(ConfigError::Validation(
            "analyzer api_key_env cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "analyzer timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_concurrency(field: &str, value: u32) -> Result<(), ConfigError> {
    if !(1..=100).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and 100, got {}",
            field, value
        )));
    }
    Ok(())
}

fn validate_delay(field: &str, value: u64) -> Result<(), ConfigError> {
    if value > MAX_POLITENESS_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "{} must be <= {}ms, got {}ms",
            field, MAX_POLITENESS_DELAY_MS, value
        )));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
