//! services/api/src/adapters/generator_llm.rs
//!
//! This module contains the adapter for the narrative-generation LLM.
//! It implements the `NarrativeModel` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use mystery_core::ports::{MysteryError, MysteryResult, NarrativeModel};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `NarrativeModel` using an OpenAI-compatible
/// chat-completion LLM in JSON-object mode.
#[derive(Clone)]
pub struct OpenAiMysteryWriter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiMysteryWriter {
    /// Creates a new `OpenAiMysteryWriter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }
}

//=========================================================================================
// `NarrativeModel` Trait Implementation
//=========================================================================================

#[async_trait]
impl NarrativeModel for OpenAiMysteryWriter {
    /// Asks the model for one complete case. Transport failures, quota
    /// errors, empty responses, and timeout expiry all surface as
    /// [`MysteryError::Generation`]; parsing and validation of the returned
    /// text are the caller's concern.
    async fn write_case(&self, system: &str, prompt: &str) -> MysteryResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| MysteryError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| MysteryError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .temperature(0.8)
            .max_tokens(2000u32)
            .n(1)
            .build()
            .map_err(|e| MysteryError::Generation(e.to_string()))?;

        debug!(model = %self.model, "requesting case narrative");
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                MysteryError::Generation(format!(
                    "model call timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e: OpenAIError| MysteryError::Generation(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(MysteryError::Generation(
                    "model response contained no text content".to_string(),
                ))
            }
        } else {
            Err(MysteryError::Generation(
                "model returned no choices in its response".to_string(),
            ))
        }
    }
}
