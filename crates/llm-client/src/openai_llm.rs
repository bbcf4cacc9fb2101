//! LlmClient backed by openai-client; prepends the caller's system message.

use anyhow::Result;
use async_trait::async_trait;
use prompt::ChatMessage;
use tracing::instrument;

use super::{chat_message_to_openai, EnvLlmConfig, LlmClient, DEFAULT_MODEL};

#[derive(Clone)]
pub struct OpenAILlmClient {
    client: openai_client::OpenAIClient,
    model: String,
}

impl OpenAILlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::new(api_key),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::with_base_url(api_key, base_url),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Client for the general model from `config`.
    pub fn from_config(config: &EnvLlmConfig) -> Self {
        Self::with_base_url(config.api_key.clone(), config.base_url.clone())
            .with_model(config.model.clone())
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenAILlmClient {
    #[instrument(skip(self, system, messages), fields(model = %self.model))]
    async fn complete(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let mut openai_messages: Vec<openai_client::ChatCompletionRequestMessage> =
            Vec::with_capacity(messages.len() + 1);
        if !system.trim().is_empty() {
            openai_messages.push(
                openai_client::ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.to_string())
                    .build()?
                    .into(),
            );
        }
        for msg in &messages {
            openai_messages.push(chat_message_to_openai(msg)?);
        }
        self.client
            .chat_completion(&self.model, openai_messages, max_tokens)
            .await
    }

    #[instrument(skip(self, bytes, instruction), fields(model = %self.model, size = bytes.len()))]
    async fn describe_image(
        &self,
        media_type: &str,
        bytes: &[u8],
        instruction: &str,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let message = openai_client::user_message_with_image(instruction, media_type, bytes)?;
        self.client
            .chat_completion(&self.model, vec![message], max_tokens)
            .await
    }
}
