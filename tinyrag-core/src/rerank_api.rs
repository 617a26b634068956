//! Reranker client for `/v1/rerank` endpoints.
//!
//! Speaks the rerank protocol served by llama.cpp server (with a reranking
//! GGUF such as bge-reranker-v2-m3 loaded with `--reranking`) and by
//! Jina-compatible gateways. This module is only available when the
//! `rerank-api` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::reranker::Reranker;

const RERANKER: &str = "RerankApi";

/// A [`Reranker`] calling a remote cross-encoder over HTTP.
///
/// Scores are returned exactly as the server reports them. For
/// bge-reranker models served by llama.cpp these are raw logits, where
/// negative values mean "not relevant".
///
/// # Example
///
/// ```rust,ignore
/// use tinyrag_core::{Reranker, RerankApiClient};
///
/// let reranker = RerankApiClient::new("http://localhost:8082/v1", "bge-reranker-v2-m3");
/// let scores = reranker.score("penalty for theft", &["Section 334 ...", "Section 1 ..."]).await?;
/// ```
pub struct RerankApiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl RerankApiClient {
    /// Create a client for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        }
    }

    /// Send `api_key` as a bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [&'a str],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

fn rerank_err(message: String) -> RagError {
    RagError::Reranker { reranker: RERANKER.into(), message }
}

/// Put scores back into input order.
///
/// Servers sort results by relevance; the `index` field refers to the
/// position in the request. Returns a vector with one entry per result so
/// that a missing result surfaces as a count mismatch.
fn scores_in_input_order(mut results: Vec<RerankResult>, document_count: usize) -> Result<Vec<f32>> {
    results.sort_by_key(|r| r.index);
    for (expected, result) in results.iter().enumerate() {
        if result.index >= document_count {
            return Err(rerank_err(format!(
                "result index {} out of range for {document_count} documents",
                result.index
            )));
        }
        if result.index != expected && results.len() == document_count {
            return Err(rerank_err(format!("duplicate or missing result for document {expected}")));
        }
    }
    Ok(results.into_iter().map(|r| r.relevance_score).collect())
}

#[async_trait]
impl Reranker for RerankApiClient {
    async fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        debug!(reranker = RERANKER, model = %self.model, document_count = documents.len(), "reranking");

        let body = RerankRequest { model: &self.model, query, documents, top_n: documents.len() };
        let mut request = self.client.post(format!("{}/rerank", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(reranker = RERANKER, error = %e, "request failed");
            rerank_err(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(reranker = RERANKER, %status, "API error");
            return Err(rerank_err(format!("API returned {status}: {body}")));
        }

        let parsed: RerankResponse = response.json().await.map_err(|e| {
            error!(reranker = RERANKER, error = %e, "failed to parse response");
            rerank_err(format!("failed to parse response: {e}"))
        })?;

        scores_in_input_order(parsed.results, documents.len())
    }
}
