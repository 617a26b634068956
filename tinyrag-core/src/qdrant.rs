//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! # Example
//!
//! ```rust,ignore
//! use tinyrag_core::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", "thailaw")?;
//! store.create(1024).await?;
//! store.insert("Section 334 ...", &embedding).await?;
//! let nearest = store.query(&query_embedding, 5).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::debug;

use crate::document::{Document, RetrievedDocument};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const CONTENT_FIELD: &str = "contents";

/// A [`VectorStore`] backed by one [Qdrant](https://qdrant.tech/) collection.
///
/// The collection uses cosine distance. Qdrant reports cosine similarity,
/// which is converted to the `1 - similarity` distance used by
/// [`DistanceMetric::Cosine`](crate::DistanceMetric::Cosine).
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorStore {
    /// Create a store for `collection` on the server at `url`.
    pub fn new(url: &str, collection: impl Into<String>) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client, collection: collection.into() })
    }

    /// Create a store from an existing client.
    pub fn from_client(client: Qdrant, collection: impl Into<String>) -> Self {
        Self { client, collection: collection.into() }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStore { backend: "qdrant".to_string(), message: e.to_string() }
    }

    /// The document text stored in a point's payload.
    fn content_of(payload: &HashMap<String, QdrantValue>) -> Result<String> {
        match payload.get(CONTENT_FIELD).and_then(|value| value.kind.as_ref()) {
            Some(Kind::StringValue(s)) => Ok(s.clone()),
            Some(_) => Err(RagError::VectorStore {
                backend: "qdrant".to_string(),
                message: format!("payload field '{CONTENT_FIELD}' is not a string"),
            }),
            None => Err(RagError::VectorStore {
                backend: "qdrant".to_string(),
                message: format!("point has no '{CONTENT_FIELD}' payload"),
            }),
        }
    }

    fn point(content: &str, embedding: &[f32]) -> PointStruct {
        let mut payload = Payload::new();
        payload.insert(CONTENT_FIELD, content.to_string());
        PointStruct::new(uuid::Uuid::new_v4().to_string(), embedding.to_vec(), payload)
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create(&self, dimensions: usize) -> Result<()> {
        if let Some(existing) = self.dimensions().await? {
            if existing != dimensions {
                return Err(RagError::Config(format!(
                    "qdrant collection '{}' has {existing} dimensions but the embedder produces {dimensions}",
                    self.collection
                )));
            }
            debug!(collection = %self.collection, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = %self.collection, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<()> {
        self.insert_batch(&[Document::new(content, embedding.to_vec())]).await
    }

    async fn insert_batch(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> =
            documents.iter().map(|d| Self::point(&d.content, &d.embedding)).collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection = %self.collection, count = documents.len(), "inserted documents into qdrant");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, embedding.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        response
            .result
            .into_iter()
            .map(|scored| {
                Ok(RetrievedDocument {
                    content: Self::content_of(&scored.payload)?,
                    distance: 1.0 - scored.score,
                })
            })
            .collect()
    }

    async fn dimensions(&self) -> Result<Option<usize>> {
        let exists = self.client.collection_exists(&self.collection).await.map_err(Self::map_err)?;
        if !exists {
            return Ok(None);
        }

        let info = self.client.collection_info(&self.collection).await.map_err(Self::map_err)?;
        let size = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                VectorsConfigKind::Params(params) => Some(params.size as usize),
                VectorsConfigKind::ParamsMap(_) => None,
            });

        match size {
            Some(size) => Ok(Some(size)),
            None => Err(RagError::VectorStore {
                backend: "qdrant".to_string(),
                message: format!("collection '{}' has no single unnamed vector", self.collection),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_read_from_string_payload() {
        let payload =
            HashMap::from([(CONTENT_FIELD.to_string(), QdrantValue::from("Section 334".to_string()))]);
        assert_eq!(QdrantVectorStore::content_of(&payload).unwrap(), "Section 334");
    }

    #[test]
    fn missing_content_is_a_vector_store_error() {
        let payload = HashMap::from([("title".to_string(), QdrantValue::from("x".to_string()))]);

        let err = QdrantVectorStore::content_of(&payload).unwrap_err();

        assert!(matches!(err, RagError::VectorStore { ref backend, .. } if backend == "qdrant"));
        assert!(err.to_string().contains("contents"), "{err}");
    }

    #[test]
    fn non_string_content_is_a_vector_store_error() {
        let payload = HashMap::from([(CONTENT_FIELD.to_string(), QdrantValue::from(7_i64))]);
        assert!(matches!(
            QdrantVectorStore::content_of(&payload),
            Err(RagError::VectorStore { .. })
        ));
    }
}
