mod client;
pub(crate) mod types;

use crate::traits::{ChatAgent, Message};
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use client::OpenAiClient;

const DEFAULT_MAX_TOKENS: u32 = 1024;

// =============================================================================
// OpenAi Agent
// =============================================================================

/// OpenAI chat agent. Also talks to any OpenAI-compatible endpoint via `with_base_url`.
#[derive(Clone)]
pub struct OpenAi {
    pub(crate) model: String,
    max_tokens: u32,
    client: OpenAiClient,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client: OpenAiClient::new(&api_key.into()),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(&url.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, messages: &[Message]) -> types::ChatRequest {
        let request = types::ChatRequest::new(&self.model)
            .messages(messages.iter().map(types::WireMessage::from));

        if types::uses_max_completion_tokens(&self.model) {
            request.max_completion_tokens(self.max_tokens)
        } else {
            request.max_tokens(self.max_tokens).temperature(0.0)
        }
    }
}

// =============================================================================
// ChatAgent Implementation
// =============================================================================

#[async_trait]
impl ChatAgent for OpenAi {
    async fn chat(&self, messages: Vec<Message>) -> Result<String> {
        let request = self.build_request(&messages);
        let response = self.client.chat(&request).await?;

        response
            .into_text()
            .ok_or_else(|| anyhow!("No response from OpenAI"))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-3.5-turbo");
        assert_eq!(ai.model, "gpt-3.5-turbo");
        assert_eq!(ai.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(ai.client.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_openai_with_base_url() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_base_url("https://custom.api.com/v1/");
        assert_eq!(ai.client.base_url(), "https://custom.api.com/v1");
    }

    #[test]
    fn test_reasoning_models_use_max_completion_tokens() {
        let ai = OpenAi::new("sk-test", "o3-mini").with_max_tokens(512);
        let request = ai.build_request(&[Message::user("hi")]);
        assert_eq!(request.max_completion_tokens, Some(512));
        assert!(request.max_tokens.is_none());
        assert!(request.temperature.is_none());
    }

    #[test]
    fn test_chat_models_are_deterministic() {
        let ai = OpenAi::new("sk-test", "gpt-3.5-turbo");
        let request = ai.build_request(&[Message::system("sys"), Message::user("hi")]);
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(DEFAULT_MAX_TOKENS));
        assert_eq!(request.messages.len(), 2);
    }
}
