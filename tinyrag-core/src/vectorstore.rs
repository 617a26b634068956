//! Vector store trait for storing and searching document embeddings.

use async_trait::async_trait;

use crate::document::{Document, RetrievedDocument};
use crate::error::Result;

/// A storage backend for document embeddings with nearest-neighbour search.
///
/// A store holds a single table of [`Document`]s whose embeddings all share
/// the dimension declared through [`create`](VectorStore::create).
///
/// Stores are expected to be safe for concurrent queries. Inserting while
/// other tasks query the same store is not supported unless the backend
/// documents otherwise.
///
/// # Example
///
/// ```rust,ignore
/// use tinyrag_core::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create(1024).await?;
/// store.insert("some text", &embedding).await?;
/// let nearest = store.query(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Initialize the store for embeddings of `dimensions` floats.
    ///
    /// Calling this again with the same dimension is a no-op. A different
    /// dimension than the one the store was created with is a
    /// [`RagError::Config`](crate::RagError::Config) error.
    async fn create(&self, dimensions: usize) -> Result<()>;

    /// Append one document.
    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<()>;

    /// Append several documents.
    ///
    /// The default implementation calls [`insert`](VectorStore::insert)
    /// sequentially.
    async fn insert_batch(&self, documents: &[Document]) -> Result<()> {
        for document in documents {
            self.insert(&document.content, &document.embedding).await?;
        }
        Ok(())
    }

    /// Return at most `k` documents nearest to `embedding`.
    ///
    /// Results are ordered by ascending distance (nearest first).
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>>;

    /// The dimension the store was created with, if it has been created.
    async fn dimensions(&self) -> Result<Option<usize>>;
}
