//! Data types that flow through ingestion and retrieval.
//!
//! Pages come out of text extraction, chunks come out of the chunker,
//! vector records go into the vector store and matches come back out.

use serde::{Deserialize, Serialize};

/// Category tag written on every record produced by ingestion.
pub const DOCUMENT_CATEGORY: &str = "document";

/// Text of a single source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    /// 1-based position of the page in the source document.
    pub page_number: u32,
}

impl Page {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_number,
        }
    }
}

/// A bounded piece of page text; the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub page_number: u32,
    /// `content` truncated to the configured byte budget, stored as metadata.
    pub source_excerpt: String,
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub page_number: u32,
    pub original_text: String,
    pub category: String,
}

/// A vector ready for upsert. `id` is the content hash of the chunk text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// A similarity-query hit. Metadata is kept as raw JSON because records
/// written by older ingestion code may not match [`RecordMetadata`].
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: String,
    pub score: f32,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
