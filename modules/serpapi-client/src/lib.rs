pub mod error;
pub mod types;

pub use error::{Result, SerpApiError};
pub use types::{OrganicResult, SearchParams, SearchResponse};

const BASE_URL: &str = "https://serpapi.com";

/// Engine name for plain Google web search.
const GOOGLE_ENGINE: &str = "google";

/// SerpAPI reports an empty result page as an `error` string rather than an empty list.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

pub struct SerpApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Run one Google search and return its organic results in ranking order.
    /// No pagination: at most `num` results come back.
    pub async fn google_search(&self, query: &str, num: u32) -> Result<Vec<OrganicResult>> {
        tracing::debug!(query, num, "SerpAPI search");

        let params = SearchParams {
            engine: GOOGLE_ENGINE,
            q: query,
            api_key: &self.api_key,
            num,
        };

        let url = format!("{}/search.json", self.base_url);
        let resp = self.client.get(&url).query(&params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SerpApiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let results = parse_search_response(&body)?;
        tracing::debug!(query, count = results.len(), "SerpAPI search complete");
        Ok(results)
    }
}

/// Decode a `search.json` body into its organic results.
pub fn parse_search_response(body: &str) -> Result<Vec<OrganicResult>> {
    let response: SearchResponse = serde_json::from_str(body)?;

    if let Some(error) = response.error {
        if error.contains(NO_RESULTS_MARKER) {
            return Ok(Vec::new());
        }
        return Err(SerpApiError::Search(error));
    }

    Ok(response.organic_results)
}
