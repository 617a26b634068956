//! Generator trait for producing answer text from a conversation.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::document::Message;
use crate::error::Result;

/// A lazy, finite sequence of text fragments from one generation call.
///
/// The concatenation of all fragments is the complete answer. The stream
/// has a single consumer and cannot be restarted; dropping it abandons the
/// generation.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A language model that answers a conversation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for logs and errors.
    fn name(&self) -> &str;

    /// Generate the complete answer for `messages`.
    ///
    /// The default implementation concatenates
    /// [`generate_stream`](Generator::generate_stream).
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        collect_fragments(self.generate_stream(messages).await?).await
    }

    /// Generate the answer for `messages` incrementally.
    async fn generate_stream(&self, messages: &[Message]) -> Result<FragmentStream>;
}

/// Drain a [`FragmentStream`] into a single string.
pub async fn collect_fragments(mut stream: FragmentStream) -> Result<String> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}
