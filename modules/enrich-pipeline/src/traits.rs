// Trait seams for the two external backends.
//
// WebSearcher: one web search per call, organic results as SearchSnippets.
// ai_client::ChatAgent: the language model, re-exported here.
//
// Mocks for both live in `testing` so the orchestrator runs without network.

use async_trait::async_trait;

use enrich_common::{EnrichError, ProviderKind, Result, SearchSnippet};
use serpapi_client::{OrganicResult, SerpApiClient, SerpApiError};

pub use ai_client::ChatAgent;

// --- WebSearcher trait ---

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// One backend request, no pagination. An empty list is a valid answer here;
    /// deciding that it is an error belongs to the caller.
    async fn search(&self, query: &str, num_results: u32) -> Result<Vec<SearchSnippet>>;

    fn name(&self) -> &str;
}

// --- SerpAPI (Google Search) ---

#[async_trait]
impl WebSearcher for SerpApiClient {
    async fn search(&self, query: &str, num_results: u32) -> Result<Vec<SearchSnippet>> {
        let results = self
            .google_search(query, num_results)
            .await
            .map_err(search_error)?;

        Ok(results.into_iter().map(snippet_from_organic).collect())
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}

/// Every SerpAPI failure is a transient search-provider failure to the pipeline.
fn search_error(err: SerpApiError) -> EnrichError {
    EnrichError::provider(ProviderKind::Search, err)
}

fn snippet_from_organic(result: OrganicResult) -> SearchSnippet {
    SearchSnippet {
        title: result.title,
        snippet: result.snippet,
        link: result.link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_result_maps_field_for_field() {
        let snippet = snippet_from_organic(OrganicResult {
            position: Some(1),
            title: Some("Globex".to_string()),
            snippet: None,
            link: Some("https://globex.example".to_string()),
        });
        assert_eq!(snippet.title.as_deref(), Some("Globex"));
        assert!(snippet.snippet.is_none());
        assert_eq!(snippet.link.as_deref(), Some("https://globex.example"));
    }

    #[test]
    fn serpapi_failures_become_retryable_search_errors() {
        let err = search_error(SerpApiError::Api {
            status: 429,
            message: "Too Many Requests".to_string(),
        });

        assert!(err.is_retryable());
        match err {
            EnrichError::Provider { provider, message } => {
                assert_eq!(provider, ProviderKind::Search);
                assert!(message.contains("Too Many Requests"));
            }
            other => panic!("expected Provider error, got {other:?}"),
        }
    }
}
