//! Pipeline wiring.
//!
//! A [`Pipeline`] owns one instance of each collaborator (object store, text
//! extractor, embedder, vector store) plus the tunables that drive them.
//! Clients are built once, from config or by the caller, and shared by every
//! call; the pipeline itself holds no mutable state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;

use pdfchat_core::chunk::ChunkParams;
use pdfchat_core::context::ContextParams;
use pdfchat_core::embedding::Embedder;
use pdfchat_core::source::{ObjectStore, TextExtractor};
use pdfchat_core::store::VectorStore;
use pdfchat_core::{PipelineError, Result};

use crate::config::Config;
use crate::embedding::OpenAIEmbedder;
use crate::extract::PdfExtractor;
use crate::ingest::{self, IngestReport};
use crate::pinecone::PineconeStore;
use crate::retrieve;
use crate::storage_fs::FsObjectStore;
use crate::storage_s3::S3ObjectStore;

/// Tunables for ingestion and retrieval.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub chunking: ChunkParams,
    /// Maximum embedding requests in flight during one ingestion.
    pub concurrency: usize,
    pub top_k: usize,
    pub context: ContextParams,
    pub ingest_timeout: Option<Duration>,
    pub retrieve_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunking: ChunkParams::default(),
            concurrency: 8,
            top_k: 5,
            context: ContextParams::default(),
            ingest_timeout: Some(Duration::from_secs(120)),
            retrieve_timeout: Some(Duration::from_secs(10)),
        }
    }
}

pub struct Pipeline {
    pub(crate) storage: Arc<dyn ObjectStore>,
    pub(crate) extractor: Arc<dyn TextExtractor>,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) vectors: Arc<dyn VectorStore>,
    pub(crate) settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            extractor,
            embedder,
            vectors,
            settings,
        }
    }

    /// Build the production pipeline: S3 or filesystem storage, PDF
    /// extraction, OpenAI embeddings and Pinecone.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let storage: Arc<dyn ObjectStore> = match config.storage.backend.as_str() {
            "s3" => {
                let Some(s3) = &config.storage.s3 else {
                    bail!("[storage.s3] section required when storage.backend = 's3'");
                };
                Arc::new(S3ObjectStore::from_config(s3)?)
            }
            "filesystem" => {
                let Some(fs) = &config.storage.filesystem else {
                    bail!("[storage.filesystem] section required when storage.backend = 'filesystem'");
                };
                Arc::new(FsObjectStore::new(fs.root.clone()))
            }
            other => bail!("Unknown storage backend: '{}'", other),
        };

        let embedder = OpenAIEmbedder::from_config(&config.embedding)?;
        let vectors = PineconeStore::from_config(&config.vector_store)?;

        tracing::debug!(
            storage = storage.backend(),
            model = %config.embedding.model,
            index = config.vector_store.index_name.as_deref().unwrap_or("-"),
            "pipeline configured"
        );

        Ok(Self::new(
            storage,
            Arc::new(PdfExtractor),
            Arc::new(embedder),
            Arc::new(vectors),
            config.pipeline_settings(),
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Fetch, extract, chunk, embed and upsert one document.
    ///
    /// Nothing is written to the vector store unless every chunk embedded
    /// successfully.
    pub async fn ingest(&self, document_key: &str) -> Result<IngestReport> {
        with_deadline(
            "ingestion",
            self.settings.ingest_timeout,
            ingest::ingest_document(self, document_key),
        )
        .await
    }

    /// Context for `query` from the namespace of `document_key`, or
    /// [`NO_RELEVANT_CONTEXT`](pdfchat_core::context::NO_RELEVANT_CONTEXT)
    /// when nothing scores above the threshold.
    pub async fn retrieve(&self, query: &str, document_key: &str) -> Result<String> {
        with_deadline(
            "retrieval",
            self.settings.retrieve_timeout,
            retrieve::retrieve_context(self, query, document_key),
        )
        .await
    }
}

async fn with_deadline<T>(
    operation: &'static str,
    deadline: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| PipelineError::Timeout {
                operation,
                secs: limit.as_secs(),
            })?,
        None => fut.await,
    }
}
