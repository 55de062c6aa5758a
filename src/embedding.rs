//! OpenAI-compatible embedding client.
//!
//! Implements [`Embedder`] over `POST {base_url}/embeddings` with a fixed
//! model. One request is sent per text.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: `backoff_base_ms × 2^attempt`, exponent capped at 5
//!
//! Transport and status failures surface as
//! [`PipelineError::EmbeddingService`]; a successful response without a
//! usable vector surfaces as [`PipelineError::InvalidResponse`] and is not
//! retried.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Serialize;

use pdfchat_core::embedding::Embedder;
use pdfchat_core::{PipelineError, Result};

use crate::config::EmbeddingConfig;

/// Embedding client for the OpenAI `/embeddings` API.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    /// Model name (e.g. `"text-embedding-ada-002"`).
    model: String,
    /// Expected vector length; responses of another length are rejected.
    dims: usize,
    max_retries: u32,
    backoff_base: Duration,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

impl OpenAIEmbedder {
    /// Build a client, reading the API key from the environment variable
    /// named by `config.api_key_env`.
    pub fn from_config(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} environment variable not set", config.api_key_env))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &EmbeddingConfig, api_key: String) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            bail!("embedding API key is empty");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build embedding HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * (1u32 << (attempt - 1).min(5))
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                tracing::warn!(attempt, ?delay, "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await.map_err(|e| {
                            PipelineError::InvalidResponse(format!("body is not JSON: {}", e))
                        })?;
                        return parse_embedding_response(&json, self.dims);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = PipelineError::EmbeddingService(format!(
                        "HTTP {}: {}",
                        status,
                        api_error_message(&body_text)
                    ));

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(PipelineError::EmbeddingService(e.to_string()));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            PipelineError::EmbeddingService("embedding failed after retries".to_string())
        }))
    }
}

/// Extract `data[0].embedding` and check its length.
fn parse_embedding_response(json: &serde_json::Value, dims: usize) -> Result<Vec<f32>> {
    let first = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .ok_or_else(|| PipelineError::InvalidResponse("missing or empty data array".to_string()))?;

    let values = first
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or_else(|| PipelineError::InvalidResponse("missing embedding".to_string()))?;

    let vector = values
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| PipelineError::InvalidResponse("non-numeric embedding value".to_string()))?;

    if vector.len() != dims {
        return Err(PipelineError::InvalidResponse(format!(
            "expected {} dimensions, got {}",
            dims,
            vector.len()
        )));
    }

    Ok(vector)
}

/// Prefer the API's `error.message` over the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(500).collect())
}
