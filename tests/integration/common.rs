use async_trait::async_trait;
use site_indexer::analyzer::{Analysis, AnalysisRequest, AnalyzerError, ContentAnalyzer};
use site_indexer::config::{parse_config, Config};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LONG_TEXT: &str =
    "Students can find opening hours, borrowing rules and study rooms on this page.";

/// Builds a config for `seed` with short delays and the given database
pub fn test_config(seed: &str, db_path: &Path, page_budget: u32, batch_size: u32) -> Config {
    let toml = format!(
        r#"
[target]
seed-url = "{seed}"

[crawler]
page-budget = {page_budget}
max-concurrent = 2
politeness-delay-ms = 0
request-timeout-secs = 5
checkpoint-interval = 2

[user-agent]
crawler-name = "TestIndexer"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[indexer]
max-concurrent = 2
batch-size = {batch_size}
session-cap = 100
min-content-chars = 50
politeness-delay-ms = 0

[analyzer]
enabled = false

[output]
database-path = "{db}"
summary-path = "./unused-summary.md"
"#,
        db = db_path.display()
    );
    parse_config(&toml).unwrap()
}

pub fn page_html(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body><main><p>{}</p>{}</main></body></html>",
        title, LONG_TEXT, body
    )
}

pub async fn mount_page(server: &MockServer, p: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

/// Analyzer that fails for URLs ending in one of `failing_suffixes`
pub struct ScriptedAnalyzer {
    pub failing_suffixes: Vec<&'static str>,
}

#[async_trait]
impl ContentAnalyzer for ScriptedAnalyzer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, AnalyzerError> {
        if self
            .failing_suffixes
            .iter()
            .any(|suffix| request.url.ends_with(suffix))
        {
            return Err(AnalyzerError::Timeout(1));
        }
        Ok(Analysis {
            keywords: vec!["library".to_string(), "study".to_string()],
            description: format!("About {}", request.title),
            topics: vec!["campus services".to_string()],
            content_type: "service".to_string(),
            language: "en".to_string(),
            sentiment: "neutral".to_string(),
            target_audience: "students".to_string(),
            content_quality: "high".to_string(),
            relevance_score: 0.75,
        })
    }
}
