use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use enrich_common::config::{DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_NUM_RESULTS};
use enrich_common::{render, EnrichError, ProviderKind, Result, SearchSnippet};

use crate::retry::{with_timeout, RetryPolicy};
use crate::traits::WebSearcher;

/// Web search for one entity. Renders the query from the template, calls the
/// searcher under the retry policy, and refuses to return an empty result list.
pub struct LookupProvider {
    searcher: Arc<dyn WebSearcher>,
    num_results: u32,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl LookupProvider {
    pub fn new(searcher: Arc<dyn WebSearcher>) -> Self {
        Self {
            searcher,
            num_results: DEFAULT_NUM_RESULTS,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    pub fn with_num_results(mut self, num_results: u32) -> Self {
        self.num_results = num_results;
        self
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
        if self.num_results == 0 {
            return Err(EnrichError::Validation(
                "num_results must be positive".to_string(),
            ));
        }
        self.retry.validate()
    }

    pub async fn search(&self, entity: &str, query_template: &str) -> Result<Vec<SearchSnippet>> {
        let query = render(query_template, entity);
        let query = query.as_str();
        let searcher = self.searcher.as_ref();
        let num_results = self.num_results;
        let call_timeout = self.call_timeout;

        debug!(entity, query, searcher = searcher.name(), "Looking up entity");

        let snippets = self
            .retry
            .run("search", move || async move {
                let snippets = with_timeout(
                    ProviderKind::Search,
                    call_timeout,
                    searcher.search(query, num_results),
                )
                .await?;

                // Zero results will not change on an immediate retry.
                if snippets.is_empty() {
                    return Err(EnrichError::NoResults {
                        entity: entity.to_string(),
                    });
                }
                Ok(snippets)
            })
            .await?;

        info!(entity, count = snippets.len(), "Lookup complete");
        Ok(snippets)
    }
}
