// Test mocks for the enrichment pipeline.
//
// Two mocks matching the two trait boundaries:
// - MockSearcher (WebSearcher): HashMap-based query→snippets, scripted failures
// - MockChat (ChatAgent): prompt-substring→reply, scripted failures
//
// Both record call counts and can share an InFlightGauge to observe how many
// calls overlap.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ai_client::{ChatAgent, Message, MessageRole};
use enrich_common::{EnrichError, ProviderKind, Result, SearchSnippet};

use crate::traits::WebSearcher;

// ---------------------------------------------------------------------------
// InFlightGauge
// ---------------------------------------------------------------------------

/// Counts concurrent calls and remembers the high-water mark.
#[derive(Default)]
pub struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }
}

struct InFlightGuard<'a>(&'a InFlightGauge);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

/// HashMap-based searcher. Returns a provider error for unregistered queries.
/// Builder pattern: `.on_query()`, `.fail_first()`, `.with_delay()`, `.with_gauge()`.
pub struct MockSearcher {
    responses: HashMap<String, Vec<SearchSnippet>>,
    failures_left: Mutex<HashMap<String, u32>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, u32>>,
    gauge: Option<Arc<InFlightGauge>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            failures_left: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            gauge: None,
        }
    }

    pub fn on_query(mut self, query: &str, snippets: Vec<SearchSnippet>) -> Self {
        self.responses.insert(query.to_string(), snippets);
        self
    }

    /// The first `times` calls for `query` fail with a transient provider error.
    pub fn fail_first(self, query: &str, times: u32) -> Self {
        self.failures_left
            .lock()
            .unwrap()
            .insert(query.to_string(), times);
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn with_gauge(mut self, gauge: Arc<InFlightGauge>) -> Self {
        self.gauge = Some(gauge);
        self
    }

    pub fn calls_for(&self, query: &str) -> u32 {
        self.calls.lock().unwrap().get(query).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &str, num_results: u32) -> Result<Vec<SearchSnippet>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(query.to_string())
            .or_insert(0) += 1;

        let _guard = self.gauge.as_ref().map(|g| g.enter());
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }

        {
            let mut failures = self.failures_left.lock().unwrap();
            if let Some(left) = failures.get_mut(query) {
                if *left > 0 {
                    *left -= 1;
                    return Err(EnrichError::provider(
                        ProviderKind::Search,
                        "MockSearcher: scripted 429 Too Many Requests",
                    ));
                }
            }
        }

        self.responses
            .get(query)
            .map(|snippets| snippets.iter().take(num_results as usize).cloned().collect())
            .ok_or_else(|| {
                EnrichError::provider(
                    ProviderKind::Search,
                    format!("MockSearcher: no search registered for {query}"),
                )
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockChat
// ---------------------------------------------------------------------------

/// Replies with the first registered answer whose needle appears in the user
/// message. Errors when nothing matches.
pub struct MockChat {
    replies: Vec<(String, String)>,
    failures_left: Mutex<u32>,
    delay: Option<Duration>,
    received: Mutex<Vec<Vec<Message>>>,
    gauge: Option<Arc<InFlightGauge>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            replies: Vec::new(),
            failures_left: Mutex::new(0),
            delay: None,
            received: Mutex::new(Vec::new()),
            gauge: None,
        }
    }

    pub fn on_prompt_containing(mut self, needle: &str, reply: &str) -> Self {
        self.replies.push((needle.to_string(), reply.to_string()));
        self
    }

    /// The first `times` calls fail, whatever the prompt.
    pub fn fail_first(self, times: u32) -> Self {
        *self.failures_left.lock().unwrap() = times;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_gauge(mut self, gauge: Arc<InFlightGauge>) -> Self {
        self.gauge = Some(gauge);
        self
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Every conversation sent so far, in call order.
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received.lock().unwrap().clone()
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatAgent for MockChat {
    async fn chat(&self, messages: Vec<Message>) -> anyhow::Result<String> {
        self.received.lock().unwrap().push(messages.clone());

        let _guard = self.gauge.as_ref().map(|g| g.enter());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                anyhow::bail!("MockChat: scripted 503 Service Unavailable");
            }
        }

        let user = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        self.replies
            .iter()
            .find(|(needle, _)| user.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| anyhow::anyhow!("MockChat: no reply registered for prompt {user:?}"))
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One snippet whose text carries `info`, so MockChat replies can key off it.
pub fn snippet_for(entity: &str, info: &str) -> SearchSnippet {
    SearchSnippet::new(
        format!("{entity} - Official Site"),
        format!("Contact {entity} at {info}"),
        format!("https://{}.example", entity.to_lowercase().replace(' ', "-")),
    )
}
