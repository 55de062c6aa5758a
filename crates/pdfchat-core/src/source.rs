//! Source-side collaborators: where document bytes come from and how they
//! become page text.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Page;

/// Read access to stored documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend label for logs (e.g. `"s3"`, `"filesystem"`).
    fn backend(&self) -> &str;

    /// Fetch the raw bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// [`SourceFetch`](crate::PipelineError::SourceFetch) when the store is
    /// unreachable or the key does not exist.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;
}

/// Turns document bytes into ordered pages.
///
/// Extraction is synchronous and CPU-bound; async callers should run it on a
/// blocking thread.
pub trait TextExtractor: Send + Sync {
    /// Extract pages in document order, numbered from 1.
    ///
    /// # Errors
    ///
    /// [`Extraction`](crate::PipelineError::Extraction) for malformed input.
    fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>>;
}
