use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{OracleRequest, OracleResponse, RewriteOracle};
use crate::error::OracleError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    content: Vec<ContentBlock>,
}

impl ChatResponse {
    fn text(&self) -> Option<String> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
            ContentBlock::Other => None,
        })
    }
}

// =============================================================================
// Claude oracle
// =============================================================================

/// Rewrite oracle backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct ClaudeOracle {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    http: reqwest::Client,
}

impl ClaudeOracle {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4000,
            base_url: ANTHROPIC_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap, OracleError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| OracleError::Config(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl RewriteOracle for ClaudeOracle {
    async fn rewrite(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        let url = format!("{}/messages", self.base_url);
        let body = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: request.directive.clone(),
            messages: vec![WireMessage {
                role: "user",
                content: request.payload.clone(),
            }],
            temperature: 0.0,
        };

        debug!(model = %self.model, "Claude rewrite request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed.text().ok_or(OracleError::EmptyOutput)?;
        Ok(OracleResponse { text })
    }
}
