//! Document ingestion.
//!
//! fetch → extract pages → chunk → embed (bounded, ordered) → upsert.
//!
//! The upsert happens once, after every chunk has a vector, so a failed
//! embedding leaves the namespace untouched. Record ids are content hashes,
//! which makes re-ingesting the same document an overwrite rather than an
//! append.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};

use pdfchat_core::chunk::{content_hash, split_page};
use pdfchat_core::models::{Chunk, Page, RecordMetadata, VectorRecord, DOCUMENT_CATEGORY};
use pdfchat_core::namespace::sanitize_key;
use pdfchat_core::source::TextExtractor;
use pdfchat_core::{PipelineError, Result};

use crate::pipeline::Pipeline;

/// Outcome of ingesting one document.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Namespace the records were written to.
    pub namespace: String,
    pub pages: usize,
    pub chunks: usize,
    /// Ids of the upserted records, in chunk order, without duplicates.
    pub record_ids: Vec<String>,
}

pub(crate) async fn ingest_document(
    pipeline: &Pipeline,
    document_key: &str,
) -> Result<IngestReport> {
    let namespace = sanitize_key(document_key);
    let settings = &pipeline.settings;

    let bytes = pipeline.storage.fetch(document_key).await?;
    tracing::debug!(
        key = document_key,
        backend = pipeline.storage.backend(),
        bytes = bytes.len(),
        "fetched document"
    );

    let pages = extract_pages(pipeline.extractor.clone(), bytes).await?;

    let chunks: Vec<Chunk> = pages
        .iter()
        .flat_map(|page| split_page(page, &settings.chunking))
        .collect();
    tracing::debug!(pages = pages.len(), chunks = chunks.len(), "split document");

    let embedder = pipeline.embedder.as_ref();
    let vectors: Vec<Vec<f32>> = stream::iter(chunks.iter())
        .map(|chunk| embedder.embed(&chunk.content))
        .buffered(settings.concurrency.max(1))
        .try_collect()
        .await?;

    let records = build_records(&chunks, vectors);

    if records.is_empty() {
        tracing::info!(
            key = document_key,
            %namespace,
            "document produced no chunks; nothing to upsert"
        );
    } else {
        pipeline.vectors.upsert(&namespace, &records).await?;
    }

    tracing::info!(
        key = document_key,
        %namespace,
        pages = pages.len(),
        chunks = chunks.len(),
        records = records.len(),
        "ingested document"
    );

    Ok(IngestReport {
        namespace,
        pages: pages.len(),
        chunks: chunks.len(),
        record_ids: records.into_iter().map(|r| r.id).collect(),
    })
}

/// Run the extractor on the blocking pool.
async fn extract_pages(extractor: Arc<dyn TextExtractor>, bytes: Vec<u8>) -> Result<Vec<Page>> {
    tokio::task::spawn_blocking(move || extractor.extract(&bytes))
        .await
        .map_err(|e| PipelineError::Extraction(format!("extraction task failed: {}", e)))?
}

/// Pair chunks with their vectors. A chunk whose text repeats an earlier
/// one is dropped; the first occurrence keeps its page number.
fn build_records(chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Vec<VectorRecord> {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .zip(vectors)
        .filter_map(|(chunk, values)| {
            let id = content_hash(&chunk.content);
            if !seen.insert(id.clone()) {
                return None;
            }
            Some(VectorRecord {
                id,
                values,
                metadata: RecordMetadata {
                    page_number: chunk.page_number,
                    original_text: chunk.source_excerpt.clone(),
                    category: DOCUMENT_CATEGORY.to_string(),
                },
            })
        })
        .collect()
}
