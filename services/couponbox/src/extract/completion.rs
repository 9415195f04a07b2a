//! Chat-completion transport used by the AI extractor

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;

/// One system + user exchange sent to the completion service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// OpenAI-compatible request body
    pub fn to_body(&self) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system },
                { "role": "user", "content": self.user },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

/// Black-box text completion: prompt in, free text out
#[async_trait]
pub trait CompletionService: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, api_key: &str, request: &CompletionRequest) -> Result<String, ExtractionError>;
}

/// OpenRouter (OpenAI-compatible) chat completions client
pub struct OpenRouterClient {
    client: Client,
    api_url: String,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            referer: config.referer.clone(),
            title: config.title.clone(),
        })
    }
}

#[async_trait]
impl CompletionService for OpenRouterClient {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, api_key: &str, request: &CompletionRequest) -> Result<String, ExtractionError> {
        let start = Instant::now();
        tracing::debug!("Completion request: model={} url={}", request.model, self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("HTTP-Referer", self.referer.as_str())
            .header("X-Title", self.title.as_str())
            .json(&request.to_body())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Status { status, body });
        }

        let raw: Value = response.json().await?;
        tracing::debug!("Completion response in {}ms", start.elapsed().as_millis());

        message_content(&raw)
    }
}

/// Pull `choices[0].message.content` out of an OpenAI-style response
pub fn message_content(raw: &Value) -> Result<String, ExtractionError> {
    raw["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ExtractionError::Decode("No content in completion response".to_string()))
}
