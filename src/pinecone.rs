//! Pinecone vector store client.
//!
//! Talks to the data plane of a single index over REST:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | upsert | `POST {host}/vectors/upsert` `{vectors, namespace}` |
//! | query  | `POST {host}/query` `{namespace, vector, topK, includeMetadata}` |
//!
//! Upserts larger than `upsert_batch_size` are sent as several requests.
//! A failure part-way leaves the earlier batches written; because record
//! ids are content hashes, re-running the ingestion converges.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use pdfchat_core::models::{Match, VectorRecord};
use pdfchat_core::store::VectorStore;
use pdfchat_core::{PipelineError, Result};

use crate::config::VectorStoreConfig;

const API_VERSION: &str = "2024-07";

/// [`VectorStore`] backed by a Pinecone index.
pub struct PineconeStore {
    client: reqwest::Client,
    host: String,
    batch_size: usize,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

/// One query match as sent by the service. `score` and `metadata` are read
/// loosely so a single malformed match cannot fail the whole query.
#[derive(Deserialize)]
struct RawMatch {
    id: String,
    #[serde(default)]
    score: Option<serde_json::Value>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl RawMatch {
    /// A missing or non-numeric score becomes 0.0; metadata that is not an
    /// object becomes an empty map.
    fn into_match(self) -> Match {
        let score = self
            .score
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .map(|s| s as f32)
            .unwrap_or(0.0);
        let metadata = match self.metadata {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        Match {
            id: self.id,
            score,
            metadata,
        }
    }
}

impl PineconeStore {
    /// Build a client, reading the API key from the environment variable
    /// named by `config.api_key_env`.
    pub fn from_config(config: &VectorStoreConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} environment variable not set", config.api_key_env))?;
        Self::new(config, &api_key)
    }

    pub fn new(config: &VectorStoreConfig, api_key: &str) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Pinecone API key");

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim()).context("invalid Pinecone API key")?,
        );
        headers.insert(
            "X-Pinecone-API-Version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build Pinecone HTTP client")?;

        Ok(Self {
            client,
            host: normalize_host(&config.index_host),
            batch_size: config.upsert_batch_size.max(1),
        })
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.host, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| PipelineError::VectorStore(format!("POST {}: {}", path, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::VectorStore(format!(
                "POST {} failed (HTTP {}): {}",
                path,
                status,
                body.chars().take(500).collect::<String>()
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<()> {
        for batch in records.chunks(self.batch_size) {
            self.post_json(
                "/vectors/upsert",
                &UpsertRequest {
                    vectors: batch,
                    namespace,
                },
            )
            .await?;
            tracing::debug!(namespace, count = batch.len(), "upserted batch");
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<Match>> {
        let resp = self
            .post_json(
                "/query",
                &QueryRequest {
                    namespace,
                    vector,
                    top_k,
                    include_metadata,
                    include_values: false,
                },
            )
            .await?;

        let parsed: QueryResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::VectorStore(format!("malformed query response: {}", e)))?;

        Ok(parsed
            .matches
            .into_iter()
            .map(RawMatch::into_match)
            .collect())
    }
}

/// Index hosts are often configured without a scheme, as the console shows them.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
