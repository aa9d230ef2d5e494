//! Analyzer backed by an OpenAI-compatible chat completions API

use crate::analyzer::{Analysis, AnalysisRequest, AnalyzerError, ContentAnalyzer};
use crate::config::AnalyzerConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = "You are a web content analyzer. Return only valid JSON.";

/// Longest error body kept in an [`AnalyzerError::Api`]
const MAX_ERROR_BODY: usize = 200;

pub struct HttpAnalyzer {
    client: Client,
    completions_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl HttpAnalyzer {
    pub fn new(config: &AnalyzerConfig, api_key: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            completions_url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    fn headers(&self) -> Result<HeaderMap, AnalyzerError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| AnalyzerError::Connection("invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl ContentAnalyzer for HttpAnalyzer {
    fn name(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, AnalyzerError> {
        let prompt = build_prompt(request);
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.completions_url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(AnalyzerError::Api {
                status,
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AnalyzerError::Timeout(self.timeout_secs)
            } else {
                AnalyzerError::Parse(format!("unexpected response shape: {}", e))
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        parse_analysis(&content)
    }
}

impl HttpAnalyzer {
    fn classify(&self, e: reqwest::Error) -> AnalyzerError {
        if e.is_timeout() {
            AnalyzerError::Timeout(self.timeout_secs)
        } else {
            AnalyzerError::Connection(e.to_string())
        }
    }
}

fn build_prompt(request: &AnalysisRequest) -> String {
    format!(
        r#"Analyze this webpage content and return a JSON response:

URL: {url}
Title: {title}
Description: {description}
Content: {text}

Return JSON with this exact structure:
{{
    "description": "2-3 sentence description of the page",
    "keywords": ["keyword1", "keyword2", "keyword3", "keyword4", "keyword5"],
    "main_topics": ["topic1", "topic2", "topic3"],
    "content_type": "article|news|blog|product|service|documentation|homepage|about|contact|other",
    "language": "two-letter language code",
    "sentiment": "positive|negative|neutral",
    "target_audience": "general|technical|business|educational",
    "content_quality": "high|medium|low",
    "relevance_score": 0.8
}}

Keywords must be specific and useful for search.
Return only valid JSON, no additional text."#,
        url = request.url,
        title = request.title,
        description = request.description,
        text = request.text,
    )
}

/// Parses a model reply into an [`Analysis`]
///
/// Tolerates code fences and chatter around the object: everything between
/// the first `{` and the last `}` is parsed. Relevance is clamped to [0, 1].
pub fn parse_analysis(reply: &str) -> Result<Analysis, AnalyzerError> {
    let trimmed = reply.trim();
    let start = trimmed
        .find('{')
        .ok_or_else(|| AnalyzerError::Parse("no JSON object in reply".to_string()))?;
    let end = trimmed
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| AnalyzerError::Parse("unterminated JSON object".to_string()))?;

    let mut analysis: Analysis = serde_json::from_str(&trimmed[start..=end])
        .map_err(|e| AnalyzerError::Parse(e.to_string()))?;

    analysis.relevance_score = if analysis.relevance_score.is_finite() {
        analysis.relevance_score.clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(analysis)
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}
