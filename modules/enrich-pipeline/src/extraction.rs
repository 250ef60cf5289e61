use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use ai_client::{truncate_to_char_boundary, Message};
use tracing::{debug, info};

use enrich_common::config::DEFAULT_CALL_TIMEOUT_SECS;
use enrich_common::{render, EnrichError, ProviderKind, Result, SearchSnippet};

use crate::retry::{with_timeout, RetryPolicy};
use crate::traits::ChatAgent;

pub const SYSTEM_PROMPT: &str = "You are an assistant that extracts the requested information \
from search results. Return only the extracted value.";

/// Bytes of the model reply shown in logs.
const LOG_PREVIEW_BYTES: usize = 80;

/// Asks the language model for one value about an entity, given its search snippets.
/// The reply is returned as-is.
pub struct ExtractionProvider {
    agent: Arc<dyn ChatAgent>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl ExtractionProvider {
    pub fn new(agent: Arc<dyn ChatAgent>) -> Self {
        Self {
            agent,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.retry.validate()
    }

    pub async fn extract(
        &self,
        entity: &str,
        prompt_template: &str,
        snippets: &[SearchSnippet],
    ) -> Result<String> {
        let user_message = build_user_message(entity, prompt_template, snippets);
        let user_message = user_message.as_str();
        let agent = self.agent.as_ref();
        let call_timeout = self.call_timeout;

        debug!(entity, model = agent.model(), snippets = snippets.len(), "Extracting");

        let reply = self
            .retry
            .run("extract", move || async move {
                let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(user_message)];
                with_timeout(ProviderKind::Llm, call_timeout, async {
                    agent
                        .chat(messages)
                        .await
                        .map_err(|e| EnrichError::provider(ProviderKind::Llm, format!("{e:#}")))
                })
                .await
            })
            .await?;

        info!(
            entity,
            reply = truncate_to_char_boundary(&reply, LOG_PREVIEW_BYTES),
            "Extraction complete"
        );
        Ok(reply)
    }
}

/// Rendered template, then a numbered listing of every snippet.
/// Absent snippet fields print as empty.
pub fn build_user_message(entity: &str, prompt_template: &str, snippets: &[SearchSnippet]) -> String {
    let mut message = render(prompt_template, entity);
    message.push_str("\nSearch Results:\n");

    for (idx, s) in snippets.iter().enumerate() {
        let _ = write!(
            message,
            "{}) Title: {}\nSnippet: {}\nURL: {}\n\n",
            idx + 1,
            s.title.as_deref().unwrap_or_default(),
            s.snippet.as_deref().unwrap_or_default(),
            s.link.as_deref().unwrap_or_default(),
        );
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_starts_with_rendered_prompt() {
        let message = build_user_message(
            "Alice",
            "Find the email of {entity}",
            &[SearchSnippet::new("Alice Smith", "alice@example.com", "https://a.example")],
        );

        assert!(message.starts_with("Find the email of Alice\nSearch Results:\n"));
        assert_eq!(message.matches("Find the email of Alice").count(), 1);
        assert!(!message.contains("{entity}"));
    }

    #[test]
    fn snippets_are_numbered_from_one() {
        let message = build_user_message(
            "Acme Corp",
            "Find the email address of {entity}",
            &[
                SearchSnippet::new("Acme", "acme@x.com", "https://acme.example"),
                SearchSnippet::new("Acme Wiki", "Founded 1947", "https://wiki.example/acme"),
            ],
        );

        assert!(message.contains(
            "1) Title: Acme\nSnippet: acme@x.com\nURL: https://acme.example\n\n"
        ));
        assert!(message.contains(
            "2) Title: Acme Wiki\nSnippet: Founded 1947\nURL: https://wiki.example/acme\n\n"
        ));
    }

    #[test]
    fn missing_snippet_fields_render_empty() {
        let snippet = SearchSnippet {
            title: Some("Globex".to_string()),
            snippet: None,
            link: None,
        };
        let message = build_user_message("Globex", "{entity}", &[snippet]);
        assert!(message.ends_with("1) Title: Globex\nSnippet: \nURL: \n\n"));
    }
}
