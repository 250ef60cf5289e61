use std::str::FromStr;

use crate::error::{EnrichError, Result};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_NUM_RESULTS: u32 = 3;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables.
/// Secrets plus run tunables; CLI flags override the tunables.
#[derive(Debug, Clone)]
pub struct Config {
    // Search
    pub serpapi_api_key: String,

    // AI / LLM
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: Option<String>,

    // Spreadsheet
    pub sheets_access_token: Option<String>,

    // Run tunables
    pub concurrency: usize,
    pub num_results: u32,
    pub call_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| EnrichError::Config(format!("{key} environment variable is required")))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Ok(Self {
            serpapi_api_key: required("SERPAPI_API_KEY")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_model: optional("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: optional("OPENAI_BASE_URL"),
            sheets_access_token: optional("GOOGLE_SHEETS_ACCESS_TOKEN"),
            concurrency: parse_or(optional("ENRICH_CONCURRENCY"), "ENRICH_CONCURRENCY", DEFAULT_CONCURRENCY)?,
            num_results: parse_or(optional("ENRICH_NUM_RESULTS"), "ENRICH_NUM_RESULTS", DEFAULT_NUM_RESULTS)?,
            call_timeout_secs: parse_or(
                optional("ENRICH_CALL_TIMEOUT_SECS"),
                "ENRICH_CALL_TIMEOUT_SECS",
                DEFAULT_CALL_TIMEOUT_SECS,
            )?,
        })
    }

    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.char_indices().nth(5).map(|(i, _)| i).unwrap_or(val.len());
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => preview(v),
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  SERPAPI_API_KEY: {}", preview(&self.serpapi_api_key));
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        tracing::info!("  OPENAI_MODEL: {}", self.openai_model);
        tracing::info!(
            "  OPENAI_BASE_URL: {}",
            self.openai_base_url.as_deref().unwrap_or("<default>")
        );
        tracing::info!(
            "  GOOGLE_SHEETS_ACCESS_TOKEN: {}",
            preview_opt(&self.sheets_access_token)
        );
        tracing::info!(
            concurrency = self.concurrency,
            num_results = self.num_results,
            call_timeout_secs = self.call_timeout_secs,
            "  Run tunables"
        );
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| EnrichError::Config(format!("{key} must be a positive number, got {v:?}"))),
    }
}
