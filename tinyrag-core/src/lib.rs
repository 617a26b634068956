//! # tinyrag-core
//!
//! A small retrieval-augmented question-answering pipeline.
//!
//! Given a question, [`RagPipeline`] embeds it, retrieves the nearest
//! documents from a [`VectorStore`], rescores them with a [`Reranker`],
//! drops the ones judged irrelevant, and asks a [`Generator`] to answer
//! strictly from what remains, returning the answer together with the
//! documents it was grounded in. When nothing relevant is found the
//! pipeline answers with a localized message instead of calling the
//! generator.
//!
//! ## Collaborators
//!
//! | Trait | Built-in implementations |
//! |-------|--------------------------|
//! | [`EmbeddingProvider`] | `OpenAIEmbeddingProvider` (feature `openai`) |
//! | [`VectorStore`] | [`InMemoryVectorStore`], `QdrantVectorStore` (feature `qdrant`) |
//! | [`Reranker`] | [`NoOpReranker`], `RerankApiClient` (feature `rerank-api`) |
//! | [`Generator`] | `OpenAIChatGenerator` (feature `openai`) |
//!
//! The OpenAI-compatible clients work against llama.cpp server, vLLM,
//! Ollama and text-embeddings-inference as well as OpenAI itself.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tinyrag_core::{AnswerRequest, InMemoryVectorStore, NoOpReranker, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .reranker(Arc::new(NoOpReranker))
//!     .generator(Arc::new(generator))
//!     .build()?;
//!
//! pipeline.create_store().await?;
//! pipeline.ingest(&["Theft is punishable by up to three years."]).await?;
//!
//! let answer = pipeline
//!     .answer(AnswerRequest::new("What is the penalty for theft?").with_language("en"))
//!     .await?;
//! println!("{}", answer.response);
//! ```

pub mod answer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod inmemory;
pub mod locale;
pub mod pipeline;
pub mod prompt;
pub mod reranker;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod chat;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;
#[cfg(feature = "rerank-api")]
pub mod rerank_api;

pub use answer::{Answer, AnswerOutcome, AnswerRequest, AnswerStream, AnswerUpdate};
pub use config::{EmbedderKind, EmbedderSettings, RagConfig, RagConfigBuilder};
pub use document::{Document, Message, RetrievedDocument, Role, ScoredDocument};
pub use embedding::{EmbedMode, EmbeddingProvider};
pub use error::{ErrorKind, RagError, Result};
pub use generator::{FragmentStream, Generator, collect_fragments};
pub use inmemory::{DistanceMetric, InMemoryVectorStore};
pub use locale::{LocaleBundle, Localizer, LocalizerBuilder, MessageKey};
pub use pipeline::{IngestReport, RagPipeline, RagPipelineBuilder, Stage, filter_relevant};
pub use reranker::{NoOpReranker, Reranker};
pub use vectorstore::VectorStore;

#[cfg(feature = "openai")]
pub use chat::OpenAIChatGenerator;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
#[cfg(feature = "rerank-api")]
pub use rerank_api::RerankApiClient;
