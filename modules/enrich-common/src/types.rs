use serde::{Deserialize, Serialize};

// --- Lookup output ---

/// One organic search result. Upstream may omit any field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSnippet {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl SearchSnippet {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            snippet: Some(snippet.into()),
            link: Some(link.into()),
        }
    }
}

// --- Run input/output ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentTask {
    pub entity: String,
    pub prompt_template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub entity: String,
    pub extracted_info: String,
}

/// A single entity that could not be enriched, recorded instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFailure {
    pub entity: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub results: Vec<EnrichmentResult>,
    pub failures: Vec<EntityFailure>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
