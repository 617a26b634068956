//! Request and result types of [`RagPipeline::answer`](crate::RagPipeline::answer).

use std::pin::Pin;

use futures::Stream;
use serde::Serialize;

use crate::document::Message;
use crate::error::Result;

/// One question to answer.
///
/// The conversation `history` is borrowed: the pipeline sends a copy of it,
/// extended with the grounded prompt, to the generator and never modifies
/// the caller's history.
#[derive(Debug, Clone, Copy)]
pub struct AnswerRequest<'a> {
    /// The user's question, as typed.
    pub query: &'a str,
    /// Earlier turns of the conversation, oldest first.
    pub history: &'a [Message],
    /// Number of documents to retrieve; the pipeline default when `None`.
    pub top_k: Option<usize>,
    /// Requested answer language; the default language when `None`.
    pub language: Option<&'a str>,
}

impl<'a> AnswerRequest<'a> {
    pub fn new(query: &'a str) -> Self {
        Self { query, history: &[], top_k: None, language: None }
    }

    pub fn with_history(mut self, history: &'a [Message]) -> Self {
        self.history = history;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_language(mut self, language: &'a str) -> Self {
        self.language = Some(language);
        self
    }
}

/// How an answer came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The generator answered from at least one relevant document.
    Answered,
    /// No document passed the relevance filter; the generator was not called.
    NoRelevantResults,
}

/// The result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub outcome: AnswerOutcome,
    /// The language actually used, after fallback.
    pub language: String,
    /// The generated answer, or the localized no-results message.
    pub text: String,
    /// Trimmed contents of the documents the answer was grounded in, in
    /// retrieval order.
    pub sources: Vec<String>,
    /// `text` followed by the localized references block; equal to `text`
    /// when there are no sources.
    pub response: String,
}

impl Answer {
    /// Whether the pipeline short-circuited without calling the generator.
    pub fn is_no_results(&self) -> bool {
        self.outcome == AnswerOutcome::NoRelevantResults
    }
}

/// One observable step of a streaming answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerUpdate {
    /// The answer text generated so far (the concatenation of all fragments
    /// received), without the references block.
    Partial(String),
    /// The final answer. Always the last item of a successful stream.
    Complete(Answer),
}

/// A stream of [`AnswerUpdate`]s ending with [`AnswerUpdate::Complete`].
///
/// Dropping the stream stops generation.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<AnswerUpdate>> + Send>>;
