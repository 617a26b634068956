//! Answer generator for OpenAI-compatible chat completion APIs.
//!
//! This module is only available when the `openai` feature is enabled.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error};

use crate::document::{Message, Role};
use crate::error::{RagError, Result};
use crate::generator::{FragmentStream, Generator};

/// A [`Generator`] backed by an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// Works with OpenAI as well as local servers exposing the same API
/// (llama.cpp server, vLLM, Ollama).
///
/// # Example
///
/// ```rust,ignore
/// use tinyrag_core::OpenAIChatGenerator;
///
/// let generator = OpenAIChatGenerator::new("http://localhost:8081/v1", "Llama-3.2-1B-Instruct")
///     .with_temperature(0.2);
/// ```
pub struct OpenAIChatGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAIChatGenerator {
    /// Create a generator for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_base(base_url);
        Self { client: Client::with_config(config), model: model.into(), temperature: None, max_tokens: None }
    }

    /// Create a generator with an API key, for hosted services.
    pub fn with_api_key(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let config = OpenAIConfig::new().with_api_base(base_url).with_api_key(api_key);
        Self { client: Client::with_config(config), model: model.into(), temperature: None, max_tokens: None }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Limit the length of generated answers.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn generation_err(&self, e: OpenAIError) -> RagError {
        RagError::Generation { generator: self.model.clone(), message: e.to_string() }
    }

    #[allow(deprecated)]
    fn build_request(&self, messages: &[Message]) -> Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| self.generation_err(e))?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages);
        if let Some(temperature) = self.temperature {
            builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder.max_tokens(max_tokens);
        }
        builder.build().map_err(|e| self.generation_err(e))
    }
}

fn to_request_message(
    message: &Message,
) -> std::result::Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.clone();
    Ok(match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default().content(content).build()?.into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default().content(content).build()?.into(),
        Role::Assistant => {
            ChatCompletionRequestAssistantMessageArgs::default().content(content).build()?.into()
        }
    })
}

#[async_trait]
impl Generator for OpenAIChatGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        debug!(model = %self.model, message_count = messages.len(), "chat completion");
        let request = self.build_request(messages)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            error!(model = %self.model, error = %e, "chat completion failed");
            self.generation_err(e)
        })?;

        let choice = response.choices.into_iter().next().ok_or_else(|| RagError::Generation {
            generator: self.model.clone(),
            message: "response contained no choices".into(),
        })?;
        Ok(choice.message.content.unwrap_or_default())
    }

    async fn generate_stream(&self, messages: &[Message]) -> Result<FragmentStream> {
        debug!(model = %self.model, message_count = messages.len(), "streaming chat completion");
        let request = self.build_request(messages)?;

        let mut chunks = self.client.chat().create_stream(request).await.map_err(|e| {
            error!(model = %self.model, error = %e, "chat completion stream failed to start");
            self.generation_err(e)
        })?;
        let model = self.model.clone();

        let fragments = try_stream! {
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|e| RagError::Generation {
                    generator: model.clone(),
                    message: format!("stream error: {e}"),
                })?;
                let delta = chunk.choices.into_iter().next().and_then(|c| c.delta.content);
                if let Some(text) = delta.filter(|t| !t.is_empty()) {
                    yield text;
                }
            }
        };

        Ok(Box::pin(fragments))
    }
}
