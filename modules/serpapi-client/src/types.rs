use serde::{Deserialize, Serialize};

/// Query parameters for `GET /search.json`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams<'a> {
    pub engine: &'a str,
    pub q: &'a str,
    pub api_key: &'a str,
    pub num: u32,
}

/// One entry of `organic_results`. SerpAPI omits fields freely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganicResult {
    pub position: Option<u32>,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub link: Option<String>,
}

/// Top-level response of `GET /search.json`. Only the parts we read.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,
    /// Set when SerpAPI rejects the search, sometimes with a 200 status.
    pub error: Option<String>,
}
