//! In-memory vector store with exhaustive nearest-neighbour search.
//!
//! This module provides [`InMemoryVectorStore`], a dependency-free vector
//! store backed by a `Vec` protected by a `tokio::sync::RwLock`. The table
//! can be written to and restored from a JSON snapshot so that an offline
//! ingestion run and a query process can share it.

use std::cmp::Ordering;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Document, RetrievedDocument};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// How distances between embeddings are measured.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Euclidean distance.
    #[default]
    L2,
    /// `1 - cosine_similarity`; 0.0 for identical directions, 2.0 for opposite.
    Cosine,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => {
                a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
            }
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Table {
    dimensions: usize,
    metric: DistanceMetric,
    rows: Vec<Document>,
}

/// An in-memory vector store.
///
/// Queries scan every row, so this store suits corpora of up to a few tens
/// of thousands of documents. All operations are async-safe via
/// `tokio::sync::RwLock`; concurrent queries share a read lock.
///
/// # Example
///
/// ```rust,ignore
/// use tinyrag_core::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create(768).await?;
/// store.insert("hello", &embedding).await?;
/// store.save("store.json").await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    metric: DistanceMetric,
    table: RwLock<Option<Table>>,
}

impl InMemoryVectorStore {
    /// Create an empty store using L2 distance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store using the given distance metric.
    pub fn with_metric(metric: DistanceMetric) -> Self {
        Self { metric, table: RwLock::new(None) }
    }

    /// The distance metric used by queries.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of stored documents (0 if the store has not been created).
    pub async fn len(&self) -> usize {
        self.table.read().await.as_ref().map_or(0, |t| t.rows.len())
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Write the store contents to a JSON snapshot at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the store has not been created or
    /// the file cannot be written.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = {
            let table = self.table.read().await;
            let table = table.as_ref().ok_or_else(|| not_created("save"))?;
            serde_json::to_vec(table).map_err(|e| store_err(format!("serialize snapshot: {e}")))?
        };
        tokio::fs::write(path, json)
            .await
            .map_err(|e| store_err(format!("write snapshot '{}': {e}", path.display())))?;
        info!(path = %path.display(), "saved vector store snapshot");
        Ok(())
    }

    /// Restore a store from a JSON snapshot written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the file cannot be read or
    /// parsed, or if a row's embedding does not match the snapshot dimension.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| store_err(format!("read snapshot '{}': {e}", path.display())))?;
        let table: Table = serde_json::from_slice(&bytes)
            .map_err(|e| store_err(format!("parse snapshot '{}': {e}", path.display())))?;

        if let Some(pos) = table.rows.iter().position(|r| r.embedding.len() != table.dimensions) {
            return Err(store_err(format!(
                "snapshot row {pos} has {} dimensions, expected {}",
                table.rows[pos].embedding.len(),
                table.dimensions
            )));
        }

        info!(path = %path.display(), rows = table.rows.len(), "loaded vector store snapshot");
        Ok(Self { metric: table.metric, table: RwLock::new(Some(table)) })
    }
}

fn store_err(message: String) -> RagError {
    RagError::VectorStore { backend: BACKEND.to_string(), message }
}

fn not_created(operation: &str) -> RagError {
    store_err(format!("cannot {operation}: store has not been created"))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create(&self, dimensions: usize) -> Result<()> {
        if dimensions == 0 {
            return Err(RagError::Config("vector dimension must be greater than zero".into()));
        }
        let mut table = self.table.write().await;
        match table.as_ref() {
            Some(existing) if existing.dimensions != dimensions => Err(RagError::Config(format!(
                "store was created with {} dimensions but the embedder produces {dimensions}",
                existing.dimensions
            ))),
            Some(_) => Ok(()),
            None => {
                *table = Some(Table { dimensions, metric: self.metric, rows: Vec::new() });
                debug!(dimensions, metric = ?self.metric, "created in-memory store");
                Ok(())
            }
        }
    }

    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<()> {
        let mut table = self.table.write().await;
        let table = table.as_mut().ok_or_else(|| not_created("insert"))?;
        if embedding.len() != table.dimensions {
            return Err(store_err(format!(
                "embedding has {} dimensions, store expects {}",
                embedding.len(),
                table.dimensions
            )));
        }
        table.rows.push(Document::new(content, embedding.to_vec()));
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        let table = self.table.read().await;
        let table = table.as_ref().ok_or_else(|| not_created("query"))?;
        if embedding.len() != table.dimensions {
            return Err(store_err(format!(
                "query embedding has {} dimensions, store expects {}",
                embedding.len(),
                table.dimensions
            )));
        }

        let mut scored: Vec<RetrievedDocument> = table
            .rows
            .iter()
            .map(|row| RetrievedDocument {
                content: row.content.clone(),
                distance: table.metric.distance(&row.embedding, embedding),
            })
            .collect();

        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn dimensions(&self) -> Result<Option<usize>> {
        Ok(self.table.read().await.as_ref().map(|t| t.dimensions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_distance_of_unit_axes() {
        let d = DistanceMetric::L2.distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_ranges_from_zero_to_two() {
        assert!(DistanceMetric::Cosine.distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((DistanceMetric::Cosine.distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn create_is_idempotent_but_rejects_other_dimensions() {
        let store = InMemoryVectorStore::new();
        store.create(3).await.unwrap();
        store.create(3).await.unwrap();
        let err = store.create(4).await.unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
        assert_eq!(store.dimensions().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn insert_before_create_fails() {
        let store = InMemoryVectorStore::new();
        let err = store.insert("text", &[1.0]).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStore { .. }));
    }

    #[tokio::test]
    async fn query_returns_nearest_first() {
        let store = InMemoryVectorStore::new();
        store.create(2).await.unwrap();
        store.insert("far", &[10.0, 10.0]).await.unwrap();
        store.insert("near", &[1.0, 1.0]).await.unwrap();
        store.insert("middle", &[3.0, 3.0]).await.unwrap();

        let results = store.query(&[0.0, 0.0], 2).await.unwrap();
        let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["near", "middle"]);
    }

    #[tokio::test]
    async fn snapshot_round_trip_keeps_rows_and_metric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = InMemoryVectorStore::with_metric(DistanceMetric::Cosine);
        store.create(2).await.unwrap();
        store.insert("a", &[1.0, 0.0]).await.unwrap();
        store.insert("b", &[0.0, 1.0]).await.unwrap();
        store.save(&path).await.unwrap();

        let restored = InMemoryVectorStore::load(&path).await.unwrap();
        assert_eq!(restored.metric(), DistanceMetric::Cosine);
        assert_eq!(restored.len().await, 2);
        let nearest = restored.query(&[0.0, 2.0], 1).await.unwrap();
        assert_eq!(nearest[0].content, "b");
    }
}
