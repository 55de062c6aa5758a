//! TOML configuration.
//!
//! Every tunable of the pipeline lives here: storage location, chunking,
//! embedding model, vector index, concurrency, retrieval threshold and
//! timeouts. Secrets are never stored in the file; each client names the
//! environment variable it reads its key from.
//!
//! ```toml
//! [storage]
//! backend = "s3"
//!
//! [storage.s3]
//! bucket = "chatpdf-uploads"
//! region = "us-east-1"
//!
//! [vector_store]
//! index_name = "chatpdf"
//! index_host = "https://chatpdf-abc123.svc.us-east-1-aws.pinecone.io"
//!
//! [retrieval]
//! score_threshold = 0.5
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pdfchat_core::chunk::{ChunkParams, DEFAULT_MAX_EXCERPT_BYTES};
use pdfchat_core::context::ContextParams;

use crate::pipeline::PipelineSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// `"s3"` or `"filesystem"`.
    pub backend: String,
    pub s3: Option<S3Config>,
    pub filesystem: Option<FilesystemConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    /// Requests then use path-style addressing.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Per-request timeout; must be > 0.
    #[serde(default = "default_s3_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_s3_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_max_excerpt_bytes")]
    pub max_excerpt_bytes: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_excerpt_bytes: default_max_excerpt_bytes(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_max_excerpt_bytes() -> usize {
    DEFAULT_MAX_EXCERPT_BYTES
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL of an OpenAI-compatible API, without the `/embeddings` suffix.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-request timeout; must be > 0.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// First backoff delay; doubles per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dims: default_dims(),
            base_url: default_openai_base_url(),
            api_key_env: default_openai_key_env(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_backoff_base_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    /// Index name, used in log output.
    #[serde(default)]
    pub index_name: Option<String>,
    /// Data-plane host of the index (`https://<index>-<project>.svc.<env>.pinecone.io`).
    pub index_host: String,
    #[serde(default = "default_pinecone_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
    /// Per-request timeout; must be > 0.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_pinecone_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}
fn default_upsert_batch_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Maximum embedding requests in flight per document.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Deadline for a whole ingestion; 0 disables it.
    #[serde(default = "default_ingest_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_ingest_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    8
}
fn default_ingest_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Deadline for a whole retrieval; 0 disables it.
    #[serde(default = "default_retrieval_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
            max_context_chars: default_max_context_chars(),
            timeout_secs: default_retrieval_timeout_secs(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_score_threshold() -> f32 {
    0.5
}
fn default_max_context_chars() -> usize {
    3000
}
fn default_retrieval_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn chunk_params(&self) -> ChunkParams {
        ChunkParams {
            chunk_size: self.chunking.chunk_size,
            chunk_overlap: self.chunking.chunk_overlap,
            max_excerpt_bytes: self.chunking.max_excerpt_bytes,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            chunking: self.chunk_params(),
            concurrency: self.ingest.concurrency,
            top_k: self.retrieval.top_k,
            context: ContextParams {
                score_threshold: self.retrieval.score_threshold,
                max_chars: self.retrieval.max_context_chars,
            },
            ingest_timeout: non_zero_secs(self.ingest.timeout_secs),
            retrieve_timeout: non_zero_secs(self.retrieval.timeout_secs),
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.storage.backend.as_str() {
        "s3" => {
            let Some(s3) = &config.storage.s3 else {
                bail!("[storage.s3] section required when storage.backend = 's3'");
            };
            if s3.bucket.trim().is_empty() {
                bail!("storage.s3.bucket must not be empty");
            }
            if s3.timeout_secs == 0 {
                bail!("storage.s3.timeout_secs must be > 0");
            }
        }
        "filesystem" => {
            if config.storage.filesystem.is_none() {
                bail!("[storage.filesystem] section required when storage.backend = 'filesystem'");
            }
        }
        other => bail!(
            "Unknown storage backend: '{}'. Must be s3 or filesystem.",
            other
        ),
    }

    if let Err(msg) = config.chunk_params().validate() {
        bail!("chunking: {}", msg);
    }

    if config.embedding.model.trim().is_empty() {
        bail!("embedding.model must not be empty");
    }
    if config.embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.timeout_secs == 0 {
        bail!("embedding.timeout_secs must be > 0");
    }

    if config.vector_store.index_host.trim().is_empty() {
        bail!("vector_store.index_host must not be empty");
    }
    if config.vector_store.upsert_batch_size == 0 {
        bail!("vector_store.upsert_batch_size must be > 0");
    }
    if config.vector_store.timeout_secs == 0 {
        bail!("vector_store.timeout_secs must be > 0");
    }

    if config.ingest.concurrency == 0 {
        bail!("ingest.concurrency must be >= 1");
    }

    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }
    if !config.retrieval.score_threshold.is_finite() {
        bail!("retrieval.score_threshold must be a finite number");
    }
    if config.retrieval.max_context_chars == 0 {
        bail!("retrieval.max_context_chars must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[storage]
backend = "filesystem"

[storage.filesystem]
root = "/tmp/uploads"

[vector_store]
index_host = "https://chatpdf-abc.svc.pinecone.io"
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.chunking.max_excerpt_bytes, 36_000);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.embedding.dims, 1536);
        assert_eq!(config.embedding.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.vector_store.api_key_env, "PINECONE_API_KEY");
        assert_eq!(config.ingest.concurrency, 8);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.score_threshold, 0.5);
        assert_eq!(config.retrieval.max_context_chars, 3000);
    }

    #[test]
    fn test_pipeline_settings_mapping() {
        let content = format!(
            "{}\n[retrieval]\nscore_threshold = 0.3\ntop_k = 8\ntimeout_secs = 0\n\n[ingest]\nconcurrency = 2\n",
            MINIMAL
        );
        let file = write_config(&content);
        let settings = load_config(file.path()).unwrap().pipeline_settings();

        assert_eq!(settings.top_k, 8);
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.context.score_threshold, 0.3);
        assert_eq!(settings.retrieve_timeout, None);
        assert_eq!(settings.ingest_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_s3_backend_requires_section() {
        let file = write_config(
            r#"
[storage]
backend = "s3"

[vector_store]
index_host = "https://x.pinecone.io"
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("[storage.s3]"), "{}", err);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let content = MINIMAL.replace("\"filesystem\"", "\"gcs\"");
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown storage backend"), "{}", err);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let content = format!("{}\n[chunking]\nchunk_size = 100\nchunk_overlap = 100\n", MINIMAL);
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"), "{}", err);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let content = format!("{}\n[ingest]\nconcurrency = 0\n", MINIMAL);
        let file = write_config(&content);
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_zero_client_timeouts_rejected() {
        let cases = [
            (
                format!("{}\n[embedding]\ntimeout_secs = 0\n", MINIMAL),
                "embedding.timeout_secs",
            ),
            (
                MINIMAL.replace("[vector_store]", "[vector_store]\ntimeout_secs = 0"),
                "vector_store.timeout_secs",
            ),
        ];
        for (content, key) in cases {
            let file = write_config(&content);
            let err = load_config(file.path()).unwrap_err();
            assert!(err.to_string().contains(key), "{}", err);
        }

        let file = write_config(
            r#"
[storage]
backend = "s3"

[storage.s3]
bucket = "uploads"
timeout_secs = 0

[vector_store]
index_host = "https://x.pinecone.io"
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("storage.s3.timeout_secs"), "{}", err);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_config(Path::new("/nonexistent/pdfchat.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pdfchat.toml"));
    }
}
