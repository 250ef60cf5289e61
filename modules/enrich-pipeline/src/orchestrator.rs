use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use enrich_common::config::DEFAULT_CONCURRENCY;
use enrich_common::{
    validate_template, EnrichError, EnrichmentResult, EnrichmentTask, EntityFailure, Result,
    RunReport,
};

use crate::extraction::ExtractionProvider;
use crate::lookup::LookupProvider;

/// What a run does when one entity cannot be enriched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// First failure fails the whole run; no partial results.
    #[default]
    AbortOnFirst,
    /// Record the failure against its entity and keep going.
    CollectErrors,
}

/// Fans lookup + extraction out across entities, with at most `concurrency`
/// entities in their network-bound phase at once. Results arrive in completion
/// order; correlate them by `entity`, never by position.
pub struct Enricher {
    lookup: LookupProvider,
    extraction: ExtractionProvider,
    concurrency: usize,
}

impl Enricher {
    pub fn new(lookup: LookupProvider, extraction: ExtractionProvider) -> Self {
        Self {
            lookup,
            extraction,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Reject bad configuration before anything is scheduled.
    pub fn validate(&self, prompt_template: &str) -> Result<()> {
        validate_template(prompt_template)?;
        if self.concurrency == 0 {
            return Err(EnrichError::Validation(
                "concurrency must be positive".to_string(),
            ));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(EnrichError::Validation(format!(
                "concurrency {} exceeds the maximum of {}",
                self.concurrency,
                Semaphore::MAX_PERMITS
            )));
        }
        self.lookup.validate()?;
        self.extraction.validate()
    }

    /// All-or-nothing run: every entity enriched, or the first error.
    pub async fn run(
        &self,
        entities: &[String],
        prompt_template: &str,
    ) -> Result<Vec<EnrichmentResult>> {
        self.validate(prompt_template)?;

        let total = entities.len();
        let started = Instant::now();
        info!(total, concurrency = self.concurrency, "Starting enrichment run");

        let gate = Semaphore::new(self.concurrency);
        let mut in_flight: FuturesUnordered<_> = tasks(entities, prompt_template)
            .map(|task| self.enrich_one(&gate, task))
            .collect();

        let mut results = Vec::with_capacity(total);
        while let Some(outcome) = in_flight.next().await {
            match outcome {
                Ok(result) => {
                    results.push(result);
                    info!(completed = results.len(), total, "Entity enriched");
                }
                Err(e) => {
                    // Dropping `in_flight` cancels every task still running.
                    warn!(
                        completed = results.len(),
                        total,
                        error = %e,
                        "Enrichment run aborted"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Enrichment run complete"
        );
        Ok(results)
    }

    /// Partial-failure run: successes and per-entity failures side by side.
    /// Only configuration errors fail the run itself.
    pub async fn run_collecting(
        &self,
        entities: &[String],
        prompt_template: &str,
    ) -> Result<RunReport> {
        self.validate(prompt_template)?;

        let total = entities.len();
        let started = Instant::now();
        info!(total, concurrency = self.concurrency, "Starting enrichment run (collecting errors)");

        let gate = Semaphore::new(self.concurrency);
        let gate = &gate;
        let mut in_flight: FuturesUnordered<_> = tasks(entities, prompt_template)
            .map(|task| async move {
                let entity = task.entity.clone();
                (entity, self.enrich_one(gate, task).await)
            })
            .collect();

        let mut report = RunReport::default();
        while let Some((entity, outcome)) = in_flight.next().await {
            match outcome {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    warn!(entity = entity.as_str(), error = %e, "Entity failed, continuing");
                    report.failures.push(EntityFailure {
                        entity,
                        error: e.to_string(),
                    });
                }
            }
            info!(
                completed = report.results.len() + report.failures.len(),
                total,
                "Entity finished"
            );
        }

        info!(
            total,
            succeeded = report.results.len(),
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Enrichment run complete"
        );
        Ok(report)
    }

    pub async fn run_with_policy(
        &self,
        entities: &[String],
        prompt_template: &str,
        policy: FailurePolicy,
    ) -> Result<RunReport> {
        match policy {
            FailurePolicy::AbortOnFirst => {
                let results = self.run(entities, prompt_template).await?;
                Ok(RunReport {
                    results,
                    failures: Vec::new(),
                })
            }
            FailurePolicy::CollectErrors => self.run_collecting(entities, prompt_template).await,
        }
    }

    /// Lookup then extraction for one entity, holding a gate permit throughout.
    async fn enrich_one(&self, gate: &Semaphore, task: EnrichmentTask) -> Result<EnrichmentResult> {
        let _permit = gate
            .acquire()
            .await
            .map_err(|_| EnrichError::Validation("concurrency gate closed".to_string()))?;

        let snippets = self
            .lookup
            .search(&task.entity, &task.prompt_template)
            .await?;
        let extracted_info = self
            .extraction
            .extract(&task.entity, &task.prompt_template, &snippets)
            .await?;

        Ok(EnrichmentResult {
            entity: task.entity,
            extracted_info,
        })
    }
}

fn tasks<'a>(
    entities: &'a [String],
    prompt_template: &'a str,
) -> impl Iterator<Item = EnrichmentTask> + 'a {
    entities.iter().map(move |entity| EnrichmentTask {
        entity: entity.clone(),
        prompt_template: prompt_template.to_string(),
    })
}
