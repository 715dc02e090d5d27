//! Text-understanding service client.
//!
//! [`CompletionModel`] is the seam between metadata extraction and the
//! remote model: it takes one prompt and returns the model's text reply.
//! [`AnthropicClient`] implements it against the Anthropic Messages API.
//!
//! One request per call. There is no retry and no backoff: a failed call is
//! reported to the caller like any other per-file failure, and the file is
//! offered again on the next run.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::AnthropicConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Model identifier, e.g. `"claude-sonnet-4-5"`.
    fn model_name(&self) -> &str;

    /// Sends a single user prompt and returns the reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Builds a client from configuration and `ANTHROPIC_API_KEY`.
    pub fn from_env(config: &AnthropicConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &AnthropicConfig, api_key: String) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionModel for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Anthropic API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_messages_response(&json)
    }
}

/// Concatenates the `text` blocks of a Messages API response.
fn parse_messages_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow!("Invalid Anthropic response: missing content array"))?;

    let text: String = content
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .collect();

    if json.get("stop_reason").and_then(|r| r.as_str()) == Some("max_tokens") {
        tracing::warn!("model reply was cut off at max_tokens");
    }

    Ok(text)
}
