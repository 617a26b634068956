//! Error types for the `tinyrag-core` crate.

use thiserror::Error;

use crate::pipeline::Stage;

/// Errors that can occur while building or running the RAG pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error, raised at startup or store creation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A collaborator returned output that breaks its interface contract.
    #[error("Contract violation ({collaborator}): expected {expected}, got {actual}")]
    ContractViolation {
        /// The collaborator that broke its contract.
        collaborator: String,
        /// What the contract requires.
        expected: String,
        /// What the collaborator actually produced.
        actual: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while scoring candidates.
    #[error("Reranker error ({reranker}): {message}")]
    Reranker {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while generating the answer text.
    #[error("Generation error ({generator}): {message}")]
    Generation {
        /// The generator that produced the error.
        generator: String,
        /// A description of the failure.
        message: String,
    },

    /// A collaborator call failed while the pipeline was in `stage`.
    #[error("Pipeline failed while {stage}: {source}")]
    Pipeline {
        /// The pipeline stage that was running.
        stage: Stage,
        /// The underlying collaborator error.
        #[source]
        source: Box<RagError>,
    },
}

/// Coarse classification of a [`RagError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal at startup: dimension mismatch, unknown model, invalid settings.
    Configuration,
    /// Fatal at invocation: a collaborator broke its output contract.
    ContractViolation,
    /// A collaborator call failed; the invocation was aborted.
    Collaborator,
}

impl RagError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::Config(_) => ErrorKind::Configuration,
            RagError::ContractViolation { .. } => ErrorKind::ContractViolation,
            RagError::Pipeline { source, .. } => source.kind(),
            RagError::Embedding { .. }
            | RagError::VectorStore { .. }
            | RagError::Reranker { .. }
            | RagError::Generation { .. } => ErrorKind::Collaborator,
        }
    }

    /// The pipeline stage this error was raised in, if it was raised by the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RagError::Pipeline { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Attach the pipeline stage to a collaborator failure.
    ///
    /// Configuration errors and contract violations are returned unchanged.
    pub(crate) fn at(self, stage: Stage) -> Self {
        match self {
            RagError::Config(_) | RagError::ContractViolation { .. } | RagError::Pipeline { .. } => {
                self
            }
            other => RagError::Pipeline { stage, source: Box::new(other) },
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
