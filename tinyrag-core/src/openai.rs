//! Embedding provider for OpenAI-compatible `/v1/embeddings` endpoints.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::EmbedderSettings;
use crate::embedding::{EmbedMode, EmbeddingProvider};
use crate::error::{RagError, Result};

/// Base URL of a llama.cpp server on its default port.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";

const PROVIDER: &str = "OpenAI";

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// Uses `reqwest` to call `{base_url}/embeddings` directly. The model and
/// its dimension come from a validated [`EmbedderSettings`]; models that
/// distinguish queries from documents get the matching instruction prefix
/// prepended to every input.
///
/// # Example
///
/// ```rust,ignore
/// use tinyrag_core::{EmbedMode, EmbedderSettings, EmbeddingProvider};
/// use tinyrag_core::openai::OpenAIEmbeddingProvider;
///
/// let settings = EmbedderSettings::parse("llama-cpp", "bge-m3")?;
/// let provider = OpenAIEmbeddingProvider::new("http://localhost:8080/v1", settings)?;
/// let embedding = provider.embed("hello world", EmbedMode::Document).await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    settings: EmbedderSettings,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for the server at `base_url` (e.g. `http://localhost:8080/v1`).
    pub fn new(base_url: impl Into<String>, settings: EmbedderSettings) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RagError::Config("embedding base URL must not be empty".into()));
        }

        Ok(Self { client: reqwest::Client::new(), base_url, api_key: None, settings })
    }

    /// Send `api_key` as a bearer token (required by OpenAI, optional for local servers).
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The model selection this provider was created with.
    pub fn settings(&self) -> &EmbedderSettings {
        &self.settings
    }

    fn prefix(&self, mode: EmbedMode) -> &'static str {
        match mode {
            EmbedMode::Query => self.settings.query_prefix(),
            EmbedMode::Document => self.settings.document_prefix(),
        }
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn embedding_err(message: String) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message }
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), ?mode, "embedding single text");

        let results = self.embed_batch(&[text], mode).await?;
        results.into_iter().next().ok_or_else(|| embedding_err("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str], mode: EmbedMode) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.settings.model(),
            ?mode,
            "embedding batch"
        );

        let prefix = self.prefix(mode);
        let request_body = EmbeddingRequest {
            model: self.settings.model(),
            input: texts.iter().map(|t| format!("{prefix}{t}")).collect(),
        };

        let mut request =
            self.client.post(format!("{}/embeddings", self.base_url)).json(&request_body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "request failed");
            embedding_err(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(embedding_err(format!("API returned {status}: {detail}")));
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            embedding_err(format!("failed to parse response: {e}"))
        })?;

        if embedding_response.data.len() != texts.len() {
            return Err(RagError::ContractViolation {
                collaborator: format!("{PROVIDER} embeddings API"),
                expected: format!("{} embeddings", texts.len()),
                actual: format!("{} embeddings", embedding_response.data.len()),
            });
        }

        embedding_response.data.sort_by_key(|d| d.index);
        let dimensions = self.dimensions();
        if let Some(bad) = embedding_response.data.iter().find(|d| d.embedding.len() != dimensions) {
            return Err(RagError::Config(format!(
                "model '{}' returned {} dimensions, expected {dimensions}",
                self.settings.model(),
                bad.embedding.len()
            )));
        }

        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.settings.dimensions()
    }

    fn supports_query_mode(&self) -> bool {
        self.settings.supports_query_mode()
    }
}
