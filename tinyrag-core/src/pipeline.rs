//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] answers a question by composing an
//! [`EmbeddingProvider`], a [`VectorStore`], a [`Reranker`] and a
//! [`Generator`]:
//!
//! ```text
//! embed query → retrieve k nearest → rerank → keep score ≥ threshold
//!   ├─ nothing kept → localized "no relevant information" message
//!   └─ otherwise    → grounded prompt → generate → answer + references
//! ```
//!
//! Every stage consumes the complete output of the previous one. The only
//! incremental stage is generation in [`RagPipeline::answer_stream`].
//!
//! # Example
//!
//! ```rust,ignore
//! use tinyrag_core::{AnswerRequest, InMemoryVectorStore, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .reranker(Arc::new(my_reranker))
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//!
//! pipeline.create_store().await?;
//! pipeline.ingest(&texts).await?;
//! let answer = pipeline.answer(AnswerRequest::new("What is the penalty for theft?")).await?;
//! println!("{}", answer.response);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::{StreamExt, stream};
use tracing::{debug, error, info, instrument};

use crate::answer::{Answer, AnswerOutcome, AnswerRequest, AnswerStream, AnswerUpdate};
use crate::config::RagConfig;
use crate::document::{Document, Message, ScoredDocument};
use crate::embedding::{EmbedMode, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::generator::Generator;
use crate::locale::{Localizer, MessageKey};
use crate::prompt::{build_prompt, compose_response};
use crate::reranker::Reranker;
use crate::vectorstore::VectorStore;

/// Number of texts embedded per batch during ingestion.
const INGEST_BATCH_SIZE: usize = 32;

/// The stages of one pipeline invocation.
///
/// `Embedding → Retrieving → Reranking → Filtering`, then either
/// `NoResults` or `Prompting → Generating → Composing`. `Ingesting` covers
/// store creation and document insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Embedding,
    Retrieving,
    Reranking,
    Filtering,
    NoResults,
    Prompting,
    Generating,
    Composing,
    Ingesting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Retrieving => "retrieving",
            Stage::Reranking => "reranking",
            Stage::Filtering => "filtering",
            Stage::NoResults => "no_results",
            Stage::Prompting => "prompting",
            Stage::Generating => "generating",
            Stage::Composing => "composing",
            Stage::Ingesting => "ingesting",
        };
        f.write_str(name)
    }
}

/// Keep the documents scoring at least `threshold`, preserving their order.
pub fn filter_relevant(scored: Vec<ScoredDocument>, threshold: f32) -> Vec<ScoredDocument> {
    scored.into_iter().filter(|d| d.score >= threshold).collect()
}

/// Outcome of ingesting a batch of texts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents written to the store.
    pub inserted: usize,
    /// Blank texts and exact duplicates that were not written.
    pub skipped: usize,
}

/// Everything decided before generation starts.
enum Grounding {
    NoResults(Answer),
    Ready { language: String, sources: Vec<String>, messages: Vec<Message> },
}

/// The RAG pipeline orchestrator.
///
/// Holds long-lived handles to its collaborators; the pipeline itself keeps
/// no mutable state between invocations, so one instance can serve
/// concurrent requests. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    localizer: Localizer,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    reranker: Arc<dyn Reranker>,
    generator: Arc<dyn Generator>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the localization provider.
    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Initialize the vector store with the embedder's dimension.
    ///
    /// Call once at startup, before ingesting or answering.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the store already holds embeddings of
    /// another dimension.
    pub async fn create_store(&self) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create(dimensions).await.map_err(|e| {
            error!(dimensions, error = %e, "failed to create vector store");
            e.at(Stage::Ingesting)
        })
    }

    /// Embed `texts` as documents and append them to the store.
    ///
    /// Blank texts and exact duplicates within `texts` are skipped.
    ///
    /// # Errors
    ///
    /// Fails on the first embedding or insertion error; documents from
    /// earlier batches stay in the store.
    #[instrument(skip_all, fields(text_count = texts.len()))]
    pub async fn ingest<S: AsRef<str>>(&self, texts: &[S]) -> Result<IngestReport> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = texts
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|t| !t.trim().is_empty())
            .filter(|t| seen.insert(*t))
            .collect();
        let report = IngestReport { inserted: unique.len(), skipped: texts.len() - unique.len() };

        for (batch_index, batch) in unique.chunks(INGEST_BATCH_SIZE).enumerate() {
            let embeddings = self
                .embedding_provider
                .embed_batch(batch, EmbedMode::Document)
                .await
                .map_err(|e| {
                    error!(batch_index, error = %e, "embedding failed during ingestion");
                    e.at(Stage::Ingesting)
                })?;
            if embeddings.len() != batch.len() {
                return Err(RagError::ContractViolation {
                    collaborator: "embedding provider".to_string(),
                    expected: format!("{} embeddings", batch.len()),
                    actual: format!("{} embeddings", embeddings.len()),
                });
            }

            let documents: Vec<Document> =
                batch.iter().zip(embeddings).map(|(text, e)| Document::new(*text, e)).collect();
            self.vector_store.insert_batch(&documents).await.map_err(|e| {
                error!(batch_index, error = %e, "insert failed during ingestion");
                e.at(Stage::Ingesting)
            })?;
            debug!(batch_index, batch_size = batch.len(), "ingested batch");
        }

        info!(inserted = report.inserted, skipped = report.skipped, "ingestion completed");
        Ok(report)
    }

    /// Retrieve the `top_k` nearest documents and score them with the reranker.
    ///
    /// Returns every candidate with its score, nearest first; nothing is
    /// filtered out yet. The reranker is not called when nothing was
    /// retrieved.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ContractViolation`] if the store returns more
    /// than `top_k` documents or the reranker returns a score count that
    /// differs from the candidate count.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        if top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }

        debug!(stage = %Stage::Embedding, "embedding query");
        let mode = self.embedding_provider.query_mode();
        let query_embedding = self.embedding_provider.embed(query, mode).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e.at(Stage::Embedding)
        })?;

        debug!(stage = %Stage::Retrieving, top_k, "querying vector store");
        let retrieved = self.vector_store.query(&query_embedding, top_k).await.map_err(|e| {
            error!(error = %e, "vector store query failed");
            e.at(Stage::Retrieving)
        })?;
        if retrieved.len() > top_k {
            return Err(RagError::ContractViolation {
                collaborator: "vector store".to_string(),
                expected: format!("at most {top_k} documents"),
                actual: format!("{} documents", retrieved.len()),
            });
        }
        if retrieved.is_empty() {
            debug!("vector store returned no candidates");
            return Ok(Vec::new());
        }

        debug!(stage = %Stage::Reranking, candidate_count = retrieved.len(), "reranking");
        let contents: Vec<&str> = retrieved.iter().map(|d| d.content.as_str()).collect();
        let scores = self.reranker.score(query, &contents).await.map_err(|e| {
            error!(error = %e, "reranking failed");
            e.at(Stage::Reranking)
        })?;
        if scores.len() != contents.len() {
            error!(
                candidate_count = contents.len(),
                score_count = scores.len(),
                "reranker score count does not match candidates"
            );
            return Err(RagError::ContractViolation {
                collaborator: "reranker".to_string(),
                expected: format!("{} scores", contents.len()),
                actual: format!("{} scores", scores.len()),
            });
        }

        Ok(retrieved
            .into_iter()
            .zip(scores)
            .map(|(doc, score)| ScoredDocument { content: doc.content, score })
            .collect())
    }

    /// Answer a question, waiting for the complete generated text.
    ///
    /// # Errors
    ///
    /// Any collaborator failure aborts the invocation; see
    /// [`RagError::kind`] for the classification.
    #[instrument(
        skip_all,
        fields(query_len = request.query.len(), top_k = ?request.top_k, language = ?request.language)
    )]
    pub async fn answer(&self, request: AnswerRequest<'_>) -> Result<Answer> {
        let (language, sources, messages) = match self.ground(request).await? {
            Grounding::NoResults(answer) => return Ok(answer),
            Grounding::Ready { language, sources, messages } => (language, sources, messages),
        };

        debug!(stage = %Stage::Generating, message_count = messages.len(), "generating answer");
        let text = self.generator.generate(&messages).await.map_err(|e| {
            error!(generator = self.generator.name(), error = %e, "generation failed");
            e.at(Stage::Generating)
        })?;

        let answer = compose(&self.localizer, language, text, sources);
        info!(source_count = answer.sources.len(), "answered query");
        Ok(answer)
    }

    /// Answer a question, yielding the partial answer after each generated
    /// fragment.
    ///
    /// Retrieval, reranking and filtering run before this returns, so their
    /// failures are reported here rather than through the stream. The stream
    /// then yields one [`AnswerUpdate::Partial`] per fragment and a final
    /// [`AnswerUpdate::Complete`]. When no document is relevant, the stream
    /// holds only the `Complete` no-results answer.
    ///
    /// Dropping the stream stops pulling fragments from the generator.
    #[instrument(
        skip_all,
        fields(query_len = request.query.len(), top_k = ?request.top_k, language = ?request.language)
    )]
    pub async fn answer_stream(&self, request: AnswerRequest<'_>) -> Result<AnswerStream> {
        let (language, sources, messages) = match self.ground(request).await? {
            Grounding::NoResults(answer) => {
                return Ok(Box::pin(stream::once(async move { Ok(AnswerUpdate::Complete(answer)) })));
            }
            Grounding::Ready { language, sources, messages } => (language, sources, messages),
        };

        debug!(stage = %Stage::Generating, message_count = messages.len(), "streaming answer");
        let generator_name = self.generator.name().to_string();
        let mut fragments = self.generator.generate_stream(&messages).await.map_err(|e| {
            error!(generator = %generator_name, error = %e, "generation failed");
            e.at(Stage::Generating)
        })?;
        let localizer = self.localizer.clone();

        let updates = async_stream::try_stream! {
            let mut text = String::new();
            while let Some(fragment) = fragments.next().await {
                let fragment = fragment.map_err(|e| {
                    error!(generator = %generator_name, error = %e, "fragment stream failed");
                    e.at(Stage::Generating)
                })?;
                text.push_str(&fragment);
                yield AnswerUpdate::Partial(text.clone());
            }

            let answer = compose(&localizer, language, text, sources);
            info!(source_count = answer.sources.len(), "streamed answer");
            yield AnswerUpdate::Complete(answer);
        };

        Ok(Box::pin(updates))
    }

    /// Run every stage up to and including prompt assembly.
    async fn ground(&self, request: AnswerRequest<'_>) -> Result<Grounding> {
        let requested = request.language.unwrap_or(self.localizer.default_language());
        let language = self.localizer.resolve(requested).to_string();
        let top_k = request.top_k.unwrap_or(self.config.top_k);

        let scored = self.retrieve(request.query, top_k).await?;
        let candidate_count = scored.len();

        let relevant = filter_relevant(scored, self.config.relevance_threshold);
        debug!(
            stage = %Stage::Filtering,
            kept = relevant.len(),
            dropped = candidate_count - relevant.len(),
            threshold = self.config.relevance_threshold,
            "filtered candidates"
        );

        if relevant.is_empty() {
            info!(stage = %Stage::NoResults, candidate_count, "no relevant documents, skipping generation");
            let text = self.localizer.message(MessageKey::NoResults, &language).to_string();
            return Ok(Grounding::NoResults(Answer {
                outcome: AnswerOutcome::NoRelevantResults,
                language,
                response: text.clone(),
                text,
                sources: Vec::new(),
            }));
        }

        debug!(stage = %Stage::Prompting, "assembling prompt");
        let sources: Vec<String> = relevant.into_iter().map(|d| d.content.trim().to_string()).collect();
        let prompt = build_prompt(self.localizer.template(&language), &sources, request.query);

        let mut messages = Vec::with_capacity(request.history.len() + 1);
        messages.extend_from_slice(request.history);
        messages.push(Message::user(prompt));

        Ok(Grounding::Ready { language, sources, messages })
    }
}

/// Attach the references block to a generated answer.
fn compose(localizer: &Localizer, language: String, text: String, sources: Vec<String>) -> Answer {
    debug!(stage = %Stage::Composing, "composing response");
    let heading = localizer.message(MessageKey::ReferencesHeading, &language);
    let response = compose_response(&text, heading, &sources);
    Answer { outcome: AnswerOutcome::Answered, language, text, sources, response }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider, vector store, reranker and generator are
/// required. The configuration defaults to [`RagConfig::default()`] and the
/// localizer to the built-in languages with the configured default
/// language.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::builder().top_k(8).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .reranker(Arc::new(reranker))
///     .generator(Arc::new(generator))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    localizer: Option<Localizer>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    reranker: Option<Arc<dyn Reranker>>,
    generator: Option<Arc<dyn Generator>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a custom localization provider.
    ///
    /// Its default language must equal the configuration's, when both are set.
    pub fn localizer(mut self, localizer: Localizer) -> Self {
        self.localizer = Some(localizer);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing, if
    /// the configured default language has no template, or if a custom
    /// localizer disagrees with the configuration on the default language.
    pub fn build(self) -> Result<RagPipeline> {
        let (config, localizer) = match (self.config, self.localizer) {
            (Some(config), Some(localizer)) => {
                if localizer.default_language() != config.default_language {
                    return Err(RagError::Config(format!(
                        "config default language '{}' does not match localizer default language '{}'",
                        config.default_language,
                        localizer.default_language()
                    )));
                }
                (config, localizer)
            }
            (None, Some(localizer)) => {
                let config =
                    RagConfig { default_language: localizer.default_language().to_string(), ..RagConfig::default() };
                (config, localizer)
            }
            (config, None) => {
                let config = config.unwrap_or_default();
                let localizer =
                    Localizer::builder().default_language(config.default_language.clone()).build()?;
                (config, localizer)
            }
        };
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let reranker =
            self.reranker.ok_or_else(|| RagError::Config("reranker is required".to_string()))?;
        let generator =
            self.generator.ok_or_else(|| RagError::Config("generator is required".to_string()))?;

        Ok(RagPipeline { config, localizer, embedding_provider, vector_store, reranker, generator })
    }
}
