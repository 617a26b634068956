use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tinyrag_core::config::{EMBEDDING_MODEL_NAME_ENV, EMBEDDING_MODEL_TYPE_ENV};
use tinyrag_core::DistanceMetric;

use crate::documents::DocumentFormat;

#[derive(Parser, Debug)]
#[command(name = "tinyrag", version, about = "Grounded question answering over your own documents")]
pub struct Cli {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Log output format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "TINYRAG_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed a document file and add it to the store.
    Ingest {
        /// Path to a JSON Lines (`{"text": ...}`) or plain-text file.
        file: PathBuf,
        /// File format; inferred from the extension when omitted.
        #[arg(long, value_enum)]
        format: Option<DocumentFormat>,
    },

    /// Answer a single question and exit.
    Ask {
        /// The question to answer.
        question: String,
        /// Print the answer as it is generated.
        #[arg(long)]
        stream: bool,
    },

    /// Start an interactive question-answering session.
    Chat {
        /// Print answers as they are generated.
        #[arg(long)]
        stream: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    L2,
    Cosine,
}

impl From<MetricArg> for DistanceMetric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::L2 => DistanceMetric::L2,
            MetricArg::Cosine => DistanceMetric::Cosine,
        }
    }
}

/// Collaborator endpoints and pipeline settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// Embedder family (`llama-cpp` or `sentence-transformers`).
    #[arg(long, global = true, env = EMBEDDING_MODEL_TYPE_ENV, default_value = "sentence-transformers")]
    pub embedding_type: String,

    /// Embedding model name; must be allowed for the embedder family.
    #[arg(long, global = true, env = EMBEDDING_MODEL_NAME_ENV, default_value = "ruri-v3-310m")]
    pub embedding_model: String,

    /// Base URL of the OpenAI-compatible embeddings server.
    #[arg(long, global = true, env = "TINYRAG_EMBEDDING_URL", default_value = "http://localhost:8080/v1")]
    pub embedding_url: String,

    /// Base URL of the OpenAI-compatible chat completions server.
    #[arg(long, global = true, env = "TINYRAG_LLM_URL", default_value = "http://localhost:8081/v1")]
    pub llm_url: String,

    /// Chat model used to generate answers.
    #[arg(long, global = true, env = "TINYRAG_LLM_MODEL", default_value = "Llama-3.2-1B-Instruct")]
    pub llm_model: String,

    /// Sampling temperature for answer generation.
    #[arg(long, global = true, env = "TINYRAG_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Base URL of the `/rerank` server.
    #[arg(long, global = true, env = "TINYRAG_RERANKER_URL", default_value = "http://localhost:8082/v1")]
    pub reranker_url: String,

    /// Reranker model name sent with each request.
    #[arg(long, global = true, env = "TINYRAG_RERANKER_MODEL", default_value = "bge-reranker-v2-m3")]
    pub reranker_model: String,

    /// Skip reranking; every retrieved document scores 0 and is kept.
    #[arg(long, global = true, env = "TINYRAG_NO_RERANK")]
    pub no_rerank: bool,

    /// Bearer token sent to all servers.
    #[arg(long, global = true, env = "TINYRAG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path of the vector store snapshot.
    #[arg(long, global = true, env = "TINYRAG_STORE", default_value = "tinyrag-store.json")]
    pub store: PathBuf,

    /// Distance metric for a newly created store.
    #[arg(long, global = true, value_enum, env = "TINYRAG_METRIC", default_value_t = MetricArg::L2)]
    pub metric: MetricArg,

    /// Use a Qdrant server instead of the snapshot file.
    #[cfg(feature = "qdrant")]
    #[arg(long, global = true, env = "TINYRAG_QDRANT_URL")]
    pub qdrant_url: Option<String>,

    /// Qdrant collection holding the documents.
    #[cfg(feature = "qdrant")]
    #[arg(long, global = true, env = "TINYRAG_QDRANT_COLLECTION", default_value = "tinyrag")]
    pub qdrant_collection: String,

    /// Language of prompts and messages for each question; unsupported
    /// codes fall back to the default language.
    #[arg(long, global = true, env = "TINYRAG_LANGUAGE")]
    pub language: Option<String>,

    /// Fallback language; must be one of the built-in languages (`en`, `th`, `ja`).
    #[arg(long, global = true, env = "TINYRAG_DEFAULT_LANGUAGE", default_value = "en")]
    pub default_language: String,

    /// Number of documents to retrieve per question.
    #[arg(
        short = 'k',
        long,
        global = true,
        env = "TINYRAG_TOP_K",
        default_value_t = 5,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub top_k: usize,

    /// Minimum reranker score for a document to be used.
    #[arg(long, global = true, env = "TINYRAG_RELEVANCE_THRESHOLD", default_value_t = 0.0, allow_negative_numbers = true)]
    pub relevance_threshold: f32,
}
