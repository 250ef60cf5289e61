use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EnrichError>;

/// Which external backend a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Search,
    Llm,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Search => f.write_str("search"),
            ProviderKind::Llm => f.write_str("llm"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("{provider} provider error: {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider} call timed out after {limit:?}")]
    Timeout {
        provider: ProviderKind,
        limit: Duration,
    },

    #[error("No search results found for '{entity}'")]
    NoResults { entity: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Table error: {0}")]
    Table(String),
}

impl EnrichError {
    pub fn provider(provider: ProviderKind, err: impl fmt::Display) -> Self {
        EnrichError::Provider {
            provider,
            message: err.to_string(),
        }
    }

    /// Transient backend failures are retried; everything else surfaces at once.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EnrichError::Provider { .. } | EnrichError::Timeout { .. }
        )
    }
}
