//! Configuration for the RAG pipeline and the embedding model selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::locale::DEFAULT_LANGUAGE;

/// Environment variable selecting the embedder backend type.
pub const EMBEDDING_MODEL_TYPE_ENV: &str = "EMBEDDING_MODEL_TYPE";
/// Environment variable selecting the embedding model name.
pub const EMBEDDING_MODEL_NAME_ENV: &str = "EMBEDDING_MODEL_NAME";

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of nearest documents requested from the vector store when a
    /// request does not specify its own `top_k`.
    pub top_k: usize,
    /// Minimum reranker score for a document to be used as context.
    ///
    /// The default of `0.0` matches the calibration of bge-reranker style
    /// cross-encoders, whose raw logits are negative for irrelevant pairs.
    pub relevance_threshold: f32,
    /// Language used when a request asks for an unsupported one.
    pub default_language: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 5, relevance_threshold: 0.0, default_language: DEFAULT_LANGUAGE.to_string() }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the default number of documents to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum reranker score for a document to be kept.
    pub fn relevance_threshold(mut self, threshold: f32) -> Self {
        self.config.relevance_threshold = threshold;
        self
    }

    /// Set the fallback language.
    pub fn default_language(mut self, language: impl Into<String>) -> Self {
        self.config.default_language = language.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `top_k == 0`
    /// - `relevance_threshold` is NaN or infinite
    /// - `default_language` is empty
    pub fn build(self) -> Result<RagConfig> {
        if self.config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if !self.config.relevance_threshold.is_finite() {
            return Err(RagError::Config(format!(
                "relevance_threshold must be finite, got {}",
                self.config.relevance_threshold
            )));
        }
        if self.config.default_language.trim().is_empty() {
            return Err(RagError::Config("default_language must not be empty".to_string()));
        }
        Ok(self.config)
    }
}

/// The family of runtime serving an embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedderKind {
    /// A GGUF model served by llama.cpp.
    LlamaCpp,
    /// A sentence-transformers model.
    SentenceTransformers,
}

impl EmbedderKind {
    /// All supported kinds.
    pub const ALL: [EmbedderKind; 2] = [EmbedderKind::LlamaCpp, EmbedderKind::SentenceTransformers];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedderKind::LlamaCpp => "llama-cpp",
            EmbedderKind::SentenceTransformers => "sentence-transformers",
        }
    }

    /// Model names accepted for this kind.
    pub fn models(&self) -> Vec<&'static str> {
        KNOWN_MODELS.iter().filter(|m| m.kind == *self).map(|m| m.name).collect()
    }
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbedderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        EmbedderKind::ALL.into_iter().find(|k| k.as_str() == s).ok_or_else(|| {
            RagError::Config(format!(
                "invalid embedder type '{s}' (available: {})",
                EmbedderKind::ALL.map(|k| k.as_str()).join(", ")
            ))
        })
    }
}

struct ModelInfo {
    kind: EmbedderKind,
    name: &'static str,
    dimensions: usize,
    query_prefix: &'static str,
    document_prefix: &'static str,
}

/// Index of `sentence-transformers` / `ruri-v3-310m` in [`KNOWN_MODELS`].
const DEFAULT_MODEL: usize = 1;

const KNOWN_MODELS: &[ModelInfo] = &[
    ModelInfo {
        kind: EmbedderKind::LlamaCpp,
        name: "bge-m3",
        dimensions: 1024,
        query_prefix: "",
        document_prefix: "",
    },
    ModelInfo {
        kind: EmbedderKind::SentenceTransformers,
        name: "ruri-v3-310m",
        dimensions: 768,
        query_prefix: "検索クエリ: ",
        document_prefix: "検索文書: ",
    },
    ModelInfo {
        kind: EmbedderKind::SentenceTransformers,
        name: "intfloat/multilingual-e5-base",
        dimensions: 768,
        query_prefix: "query: ",
        document_prefix: "passage: ",
    },
    ModelInfo {
        kind: EmbedderKind::SentenceTransformers,
        name: "BAAI/bge-m3",
        dimensions: 1024,
        query_prefix: "",
        document_prefix: "",
    },
];

/// A validated embedding model selection.
///
/// Resolved once at startup and then handed to the embedding provider.
/// Only the models in the allow-list can be selected, which lets the
/// settings report the model's output dimension and whether it embeds
/// queries differently from documents.
///
/// # Example
///
/// ```rust,ignore
/// use tinyrag_core::{EmbedderKind, EmbedderSettings};
///
/// let settings = EmbedderSettings::new(EmbedderKind::LlamaCpp, "bge-m3")?;
/// assert_eq!(settings.dimensions(), 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedderSettings {
    kind: EmbedderKind,
    model: String,
    #[serde(skip)]
    entry: usize,
}

impl EmbedderSettings {
    /// Select `model` served by a `kind` runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the model is not in the allow-list
    /// for `kind`.
    pub fn new(kind: EmbedderKind, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let entry = KNOWN_MODELS
            .iter()
            .position(|m| m.kind == kind && m.name == model)
            .ok_or_else(|| {
                RagError::Config(format!(
                    "invalid model name '{model}' for type {kind} (available: {})",
                    kind.models().join(", ")
                ))
            })?;
        Ok(Self { kind, model, entry })
    }

    /// Parse the type and model names, as given on the command line or in
    /// the environment.
    pub fn parse(kind: &str, model: &str) -> Result<Self> {
        Self::new(kind.parse()?, model)
    }

    /// Read [`EMBEDDING_MODEL_TYPE_ENV`] and [`EMBEDDING_MODEL_NAME_ENV`],
    /// defaulting to `sentence-transformers` / `ruri-v3-310m`.
    pub fn from_env() -> Result<Self> {
        let default = &KNOWN_MODELS[DEFAULT_MODEL];
        let kind = std::env::var(EMBEDDING_MODEL_TYPE_ENV)
            .unwrap_or_else(|_| default.kind.as_str().to_string());
        let model =
            std::env::var(EMBEDDING_MODEL_NAME_ENV).unwrap_or_else(|_| default.name.to_string());
        Self::parse(&kind, &model)
    }

    fn info(&self) -> &'static ModelInfo {
        &KNOWN_MODELS[self.entry]
    }

    pub fn kind(&self) -> EmbedderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Output dimension of the model.
    pub fn dimensions(&self) -> usize {
        self.info().dimensions
    }

    /// Whether the model expects different inputs for queries and documents.
    pub fn supports_query_mode(&self) -> bool {
        !self.info().query_prefix.is_empty()
    }

    /// Instruction prefix for query texts.
    pub fn query_prefix(&self) -> &'static str {
        self.info().query_prefix
    }

    /// Instruction prefix for document texts.
    pub fn document_prefix(&self) -> &'static str {
        self.info().document_prefix
    }
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        let info = &KNOWN_MODELS[DEFAULT_MODEL];
        Self { kind: info.kind, model: info.name.to_string(), entry: DEFAULT_MODEL }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_embedder_is_ruri_from_the_allow_list() {
        assert_eq!(KNOWN_MODELS[DEFAULT_MODEL].name, "ruri-v3-310m");

        let default = EmbedderSettings::default();
        let looked_up =
            EmbedderSettings::new(EmbedderKind::SentenceTransformers, "ruri-v3-310m").unwrap();
        assert_eq!(default, looked_up);
        assert_eq!(default.dimensions(), 768);
        assert_eq!(default.query_prefix(), "検索クエリ: ");
    }

    #[test]
    fn default_config_is_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config, RagConfig::default());
        assert_eq!(config.top_k, 5);
        assert_eq!(config.relevance_threshold, 0.0);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        assert!(matches!(RagConfig::builder().top_k(0).build(), Err(RagError::Config(_))));
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let result = RagConfig::builder().relevance_threshold(f32::NAN).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn known_models_resolve_their_facts() {
        let bge = EmbedderSettings::parse("llama-cpp", "bge-m3").unwrap();
        assert_eq!(bge.dimensions(), 1024);
        assert!(!bge.supports_query_mode());

        let e5 = EmbedderSettings::parse("sentence-transformers", "intfloat/multilingual-e5-base")
            .unwrap();
        assert_eq!(e5.dimensions(), 768);
        assert!(e5.supports_query_mode());
        assert_eq!(e5.query_prefix(), "query: ");
    }

    #[test]
    fn default_settings_match_ruri() {
        let default = EmbedderSettings::default();
        assert_eq!(default, EmbedderSettings::parse("sentence-transformers", "ruri-v3-310m").unwrap());
        assert_eq!(default.document_prefix(), "検索文書: ");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = EmbedderSettings::parse("onnx", "bge-m3").unwrap_err();
        assert!(err.to_string().contains("invalid embedder type"));
    }

    #[test]
    fn model_must_belong_to_its_type() {
        let err = EmbedderSettings::parse("llama-cpp", "ruri-v3-310m").unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }
}
