//! Reranker trait for scoring retrieved documents against a query.

use async_trait::async_trait;

use crate::error::Result;

/// A second-stage relevance judge over a small candidate set.
///
/// Implementations typically wrap a cross-encoder model. Scores follow the
/// model's own calibration: higher is more relevant, and for the bundled
/// models a score of `0.0` or more means "at least weakly relevant".
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score every document against `query`.
    ///
    /// Must return exactly one score per document, in the same order as
    /// `documents`.
    async fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>>;
}

/// A reranker that accepts every candidate with a score of `0.0`.
///
/// Useful when no reranking model is available: retrieval order is kept
/// and nothing is filtered out at the default threshold.
///
/// # Example
///
/// ```rust,ignore
/// use tinyrag_core::{NoOpReranker, Reranker};
///
/// let scores = NoOpReranker.score("query", &["a", "b"]).await?;
/// assert_eq!(scores, vec![0.0, 0.0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn score(&self, _query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        Ok(vec![0.0; documents.len()])
    }
}
