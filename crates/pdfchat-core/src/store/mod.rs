//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is everything the pipeline needs from a vector
//! database: namespaced bulk upsert and namespaced top-K similarity query.
//! Implementations must be `Send + Sync` to be shared across tasks.
//!
//! | Implementation | Where |
//! |----------------|-------|
//! | [`memory::InMemoryVectorStore`] | this crate; tests and embedding |
//! | `PineconeStore` | `pdfchat` app crate |

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Match, VectorRecord};

/// Namespaced storage of embedding vectors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite `records` in `namespace`, keyed by record id.
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<()>;

    /// Return up to `top_k` records of `namespace` most similar to `vector`,
    /// best first. A namespace that was never written yields no matches.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<Match>>;
}
