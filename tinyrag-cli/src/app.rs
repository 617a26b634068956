//! Collaborator wiring for the CLI commands.
//!
//! Every handle is constructed once here and injected into the pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tinyrag_core::{
    AnswerRequest, DistanceMetric, EmbedderSettings, InMemoryVectorStore, NoOpReranker,
    OpenAIChatGenerator, OpenAIEmbeddingProvider, RagConfig, RagPipeline, RerankApiClient,
    Reranker, VectorStore,
};
use tracing::{info, warn};

use crate::cli::BackendArgs;

/// Where the documents live between runs.
enum StoreHandle {
    Snapshot { store: Arc<InMemoryVectorStore>, path: PathBuf },
    #[cfg(feature = "qdrant")]
    Qdrant,
}

/// A ready pipeline plus the store it was built on.
pub struct App {
    pipeline: RagPipeline,
    store: StoreHandle,
    language: Option<String>,
}

impl App {
    /// Build every collaborator from `args` and create the store.
    ///
    /// An existing snapshot is loaded; creating the store then rejects a
    /// snapshot whose dimension differs from the configured embedder's.
    pub async fn open(args: &BackendArgs) -> anyhow::Result<Self> {
        let settings = EmbedderSettings::parse(&args.embedding_type, &args.embedding_model)?;
        let config = RagConfig::builder()
            .top_k(args.top_k)
            .relevance_threshold(args.relevance_threshold)
            .default_language(args.default_language.clone())
            .build()?;
        info!(
            embedder = %settings.kind(),
            model = settings.model(),
            dimensions = settings.dimensions(),
            top_k = config.top_k,
            default_language = %config.default_language,
            language = ?args.language,
            "starting pipeline"
        );

        let mut embedder = OpenAIEmbeddingProvider::new(args.embedding_url.clone(), settings)?;
        let generator = match &args.api_key {
            Some(key) => OpenAIChatGenerator::with_api_key(&args.llm_url, key, &args.llm_model),
            None => OpenAIChatGenerator::new(&args.llm_url, &args.llm_model),
        };
        let generator = match args.temperature {
            Some(t) => generator.with_temperature(t),
            None => generator,
        };
        let reranker: Arc<dyn Reranker> = if args.no_rerank {
            Arc::new(NoOpReranker)
        } else {
            let mut client = RerankApiClient::new(&args.reranker_url, &args.reranker_model);
            if let Some(key) = &args.api_key {
                client = client.with_api_key(key);
            }
            Arc::new(client)
        };
        if let Some(key) = &args.api_key {
            embedder = embedder.with_api_key(key);
        }

        let (vector_store, store) = open_store(args).await?;

        let pipeline = RagPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(embedder))
            .vector_store(vector_store)
            .reranker(reranker)
            .generator(Arc::new(generator))
            .build()?;
        pipeline.create_store().await.context("failed to open the vector store")?;

        Ok(Self { pipeline, store, language: args.language.clone() })
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.pipeline
    }

    /// A request for `question` in the language given on the command line.
    ///
    /// The pipeline resolves an unsupported language to the default one.
    pub fn request<'a>(&'a self, question: &'a str) -> AnswerRequest<'a> {
        match &self.language {
            Some(language) => AnswerRequest::new(question).with_language(language),
            None => AnswerRequest::new(question),
        }
    }

    /// Write the store to disk, if it is a snapshot.
    pub async fn persist(&self) -> anyhow::Result<()> {
        match &self.store {
            StoreHandle::Snapshot { store, path } => {
                store.save(path).await?;
                Ok(())
            }
            #[cfg(feature = "qdrant")]
            StoreHandle::Qdrant => Ok(()),
        }
    }
}

async fn open_store(args: &BackendArgs) -> anyhow::Result<(Arc<dyn VectorStore>, StoreHandle)> {
    #[cfg(feature = "qdrant")]
    if let Some(url) = &args.qdrant_url {
        let store = tinyrag_core::QdrantVectorStore::new(url, args.qdrant_collection.clone())?;
        info!(url = %url, collection = %args.qdrant_collection, "using qdrant store");
        let store: Arc<dyn VectorStore> = Arc::new(store);
        return Ok((store, StoreHandle::Qdrant));
    }

    let store = if tokio::fs::try_exists(&args.store).await.unwrap_or(false) {
        let store = InMemoryVectorStore::load(&args.store).await?;
        if store.metric() != DistanceMetric::from(args.metric) {
            warn!(
                snapshot = ?store.metric(),
                requested = ?args.metric,
                "snapshot was built with another metric, keeping the snapshot's"
            );
        }
        store
    } else {
        info!(path = %args.store.display(), "no snapshot found, starting with an empty store");
        InMemoryVectorStore::with_metric(DistanceMetric::from(args.metric))
    };

    let store = Arc::new(store);
    let handle: Arc<dyn VectorStore> = store.clone();
    Ok((handle, StoreHandle::Snapshot { store, path: args.store.clone() }))
}
