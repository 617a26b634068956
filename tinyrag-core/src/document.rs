//! Data types for documents, retrieval results and conversation turns.

use serde::{Deserialize, Serialize};

/// A unit of retrievable text together with its vector embedding.
///
/// Documents are identified only by their position in the store. They are
/// created during ingestion and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The text content of the document.
    pub content: String,
    /// The vector embedding of `content`.
    pub embedding: Vec<f32>,
}

impl Document {
    /// Create a document from its content and embedding.
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self { content: content.into(), embedding }
    }
}

/// A document returned by a nearest-neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    /// The retrieved document content.
    pub content: String,
    /// The distance to the query embedding (lower is nearer).
    pub distance: f32,
}

/// A retrieved document paired with its reranker relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredDocument {
    /// The document content.
    pub content: String,
    /// The relevance score assigned by the reranker (higher is more relevant).
    pub score: f32,
}

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The human asking questions.
    User,
    /// The model's replies.
    Assistant,
}

impl Role {
    /// The wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}
