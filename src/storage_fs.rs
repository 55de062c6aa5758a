//! Local filesystem object store.
//!
//! Resolves document keys as relative paths under a configured root. Used
//! for local development and for ingesting documents that were never
//! uploaded to S3.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use pdfchat_core::source::ObjectStore;
use pdfchat_core::{PipelineError, Result};

/// [`ObjectStore`] reading files below `root`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path for `key`, refusing anything that could escape the root.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(PipelineError::source_fetch(
                key,
                "key must be a relative path inside the storage root",
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn backend(&self) -> &str {
        "filesystem"
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| PipelineError::source_fetch(key, format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_reads_nested_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("uploads")).unwrap();
        std::fs::write(tmp.path().join("uploads/paper.pdf"), b"%PDF").unwrap();

        let store = FsObjectStore::new(tmp.path());
        assert_eq!(store.fetch("uploads/paper.pdf").await.unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_missing_file_is_source_fetch_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path());
        let err = store.fetch("nope.pdf").await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceFetch { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_rejects_parent_and_absolute_paths() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path().join("root"));
        assert!(store.fetch("../secret.pdf").await.is_err());
        assert!(store.fetch("a/../../secret.pdf").await.is_err());
        assert!(store.fetch("/etc/passwd").await.is_err());
        assert!(store.fetch("").await.is_err());
    }
}
