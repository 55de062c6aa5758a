//! In-memory [`VectorStore`] for tests and single-process use.
//!
//! Records live in a `HashMap` per namespace behind a `std::sync::RwLock`.
//! Queries are brute-force cosine similarity over the namespace.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{PipelineError, Result};
use crate::models::{Match, VectorRecord};

use super::VectorStore;

/// In-memory vector store partitioned by namespace.
#[derive(Default)]
pub struct InMemoryVectorStore {
    namespaces: RwLock<HashMap<String, HashMap<String, VectorRecord>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored in `namespace`.
    pub fn len(&self, namespace: &str) -> usize {
        let guard = self.namespaces.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(namespace).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Record ids in `namespace`, sorted.
    pub fn ids(&self, namespace: &str) -> Vec<String> {
        let guard = self.namespaces.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = guard
            .get(namespace)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// A copy of the record `id` in `namespace`, if present.
    pub fn get(&self, namespace: &str, id: &str) -> Option<VectorRecord> {
        let guard = self.namespaces.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(namespace).and_then(|records| records.get(id)).cloned()
    }

    /// Names of all namespaces holding at least one record, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let guard = self.namespaces.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = guard
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<()> {
        let mut guard = self.namespaces.write().unwrap_or_else(PoisonError::into_inner);
        let stored = guard.entry(namespace.to_string()).or_default();
        for record in records {
            stored.insert(record.id.clone(), record.clone());
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
        let guard = self.namespaces.read().unwrap_or_else(PoisonError::into_inner);
        let Some(records) = guard.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches = Vec::with_capacity(records.len());
        for record in records.values() {
            if record.values.len() != vector.len() {
                return Err(PipelineError::VectorStore(format!(
                    "query vector has {} dimensions, namespace '{}' stores {}",
                    vector.len(),
                    namespace,
                    record.values.len()
                )));
            }
            let metadata = if include_metadata {
                match serde_json::to_value(&record.metadata) {
                    Ok(serde_json::Value::Object(map)) => map,
                    _ => serde_json::Map::new(),
                }
            } else {
                serde_json::Map::new()
            };
            matches.push(Match {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata,
            });
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}
