use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// Message Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// ChatAgent Trait
// =============================================================================

/// A chat model that answers a conversation with free text.
#[async_trait]
pub trait ChatAgent: Send + Sync {
    /// Send the conversation and return the assistant's reply, unmodified.
    async fn chat(&self, messages: Vec<Message>) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
