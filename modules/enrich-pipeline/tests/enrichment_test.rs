//! Orchestrator runs against the mock backends.
//!
//! No network: MockSearcher answers by rendered query, MockChat by a substring
//! of the user message. Timing-sensitive cases run on tokio's paused clock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use enrich_common::{EnrichError, EnrichmentResult};
use enrich_pipeline::testing::{snippet_for, InFlightGauge, MockChat, MockSearcher};
use enrich_pipeline::{Enricher, ExtractionProvider, FailurePolicy, LookupProvider, RetryPolicy};

const TEMPLATE: &str = "Find the email address of {entity}";

fn query(entity: &str) -> String {
    TEMPLATE.replace("{entity}", entity)
}

fn entities(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Searcher + chat that know every (entity, info) pair.
fn backends(pairs: &[(&str, &str)]) -> (MockSearcher, MockChat) {
    let mut searcher = MockSearcher::new();
    let mut chat = MockChat::new();
    for (entity, info) in pairs {
        searcher = searcher.on_query(&query(entity), vec![snippet_for(entity, info)]);
        chat = chat.on_prompt_containing(&format!("Contact {entity} at"), info);
    }
    (searcher, chat)
}

fn enricher(searcher: Arc<MockSearcher>, chat: Arc<MockChat>, concurrency: usize) -> Enricher {
    Enricher::new(
        LookupProvider::new(searcher).with_retry(RetryPolicy::immediate(3)),
        ExtractionProvider::new(chat).with_retry(RetryPolicy::immediate(3)),
    )
    .with_concurrency(concurrency)
}

fn as_set(results: &[EnrichmentResult]) -> HashSet<(String, String)> {
    results
        .iter()
        .map(|r| (r.entity.clone(), r.extracted_info.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_companies_end_to_end() {
    let (searcher, chat) = backends(&[
        ("Acme Corp", "acme@x.com"),
        ("Globex", "contact@globex.com"),
    ]);
    let enricher = enricher(Arc::new(searcher), Arc::new(chat), 2);

    let results = enricher
        .run(&entities(&["Acme Corp", "Globex"]), TEMPLATE)
        .await
        .unwrap();

    let expected: HashSet<(String, String)> = [
        ("Acme Corp".to_string(), "acme@x.com".to_string()),
        ("Globex".to_string(), "contact@globex.com".to_string()),
    ]
    .into_iter()
    .collect();
    assert_eq!(as_set(&results), expected);
}

#[tokio::test]
async fn empty_entity_list_yields_empty_results() {
    let enricher = enricher(Arc::new(MockSearcher::new()), Arc::new(MockChat::new()), 3);
    let results = enricher.run(&[], TEMPLATE).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn results_follow_completion_order_but_keep_identity() {
    let (searcher, chat) = backends(&[
        ("Slow Co", "slow@slow.co"),
        ("Fast Inc", "hi@fast.inc"),
    ]);
    let searcher = searcher.with_delay(&query("Slow Co"), Duration::from_millis(500));
    let enricher = enricher(Arc::new(searcher), Arc::new(chat), 2);

    let results = enricher
        .run(&entities(&["Slow Co", "Fast Inc"]), TEMPLATE)
        .await
        .unwrap();

    // Fast Inc finishes first even though it was listed second.
    assert_eq!(results[0].entity, "Fast Inc");
    assert_eq!(results[1].entity, "Slow Co");

    let by_entity: HashMap<&str, &str> = results
        .iter()
        .map(|r| (r.entity.as_str(), r.extracted_info.as_str()))
        .collect();
    assert_eq!(by_entity["Slow Co"], "slow@slow.co");
    assert_eq!(by_entity["Fast Inc"], "hi@fast.inc");
}

#[tokio::test]
async fn concurrency_changes_timing_not_content() {
    let pairs = [
        ("Acme Corp", "acme@x.com"),
        ("Globex", "contact@globex.com"),
        ("Initech", "info@initech.com"),
        ("Umbrella", "press@umbrella.com"),
        ("Hooli", "hi@hooli.com"),
    ];
    let names: Vec<&str> = pairs.iter().map(|(e, _)| *e).collect();

    let (s1, c1) = backends(&pairs);
    let serial = enricher(Arc::new(s1), Arc::new(c1), 1)
        .run(&entities(&names), TEMPLATE)
        .await
        .unwrap();

    let (s5, c5) = backends(&pairs);
    let parallel = enricher(Arc::new(s5), Arc::new(c5), 5)
        .run(&entities(&names), TEMPLATE)
        .await
        .unwrap();

    assert_eq!(serial.len(), pairs.len());
    assert_eq!(as_set(&serial), as_set(&parallel));
}

#[tokio::test]
async fn duplicate_entities_each_get_a_result() {
    let (searcher, chat) = backends(&[("Acme Corp", "acme@x.com")]);
    let searcher = Arc::new(searcher);
    let enricher = enricher(searcher.clone(), Arc::new(chat), 2);

    let results = enricher
        .run(&entities(&["Acme Corp", "Acme Corp"]), TEMPLATE)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.extracted_info == "acme@x.com"));
    assert_eq!(searcher.calls_for(&query("Acme Corp")), 2);
}

// ---------------------------------------------------------------------------
// Admission gate
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn never_more_than_concurrency_in_flight() {
    let gauge = InFlightGauge::new();
    let pairs: Vec<(String, String)> = (0..10)
        .map(|i| (format!("Company {i}"), format!("c{i}@example.com")))
        .collect();

    let mut searcher = MockSearcher::new().with_gauge(gauge.clone());
    let mut chat = MockChat::new()
        .with_gauge(gauge.clone())
        .with_delay(Duration::from_millis(50));
    for (entity, info) in &pairs {
        searcher = searcher
            .on_query(&query(entity), vec![snippet_for(entity, info)])
            .with_delay(&query(entity), Duration::from_millis(100));
        chat = chat.on_prompt_containing(&format!("Contact {entity} at"), info);
    }

    let names: Vec<String> = pairs.iter().map(|(e, _)| e.clone()).collect();
    let results = enricher(Arc::new(searcher), Arc::new(chat), 3)
        .run(&names, TEMPLATE)
        .await
        .unwrap();

    assert_eq!(results.len(), 10);
    assert_eq!(gauge.peak(), 3);
}

// ---------------------------------------------------------------------------
// Failure policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_results_aborts_the_whole_run() {
    let (searcher, chat) = backends(&[("Acme Corp", "acme@x.com")]);
    let searcher = Arc::new(searcher.on_query(&query("Initech"), vec![]));
    let enricher = enricher(searcher.clone(), Arc::new(chat), 1);

    let err = enricher
        .run(&entities(&["Initech", "Acme Corp"]), TEMPLATE)
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichError::NoResults { ref entity } if entity == "Initech"));
    assert_eq!(searcher.calls_for(&query("Initech")), 1);
}

#[tokio::test]
async fn transient_failures_are_absorbed_by_retry() {
    let (searcher, chat) = backends(&[
        ("Acme Corp", "acme@x.com"),
        ("Globex", "contact@globex.com"),
    ]);
    let searcher = Arc::new(searcher.fail_first(&query("Globex"), 2));
    let chat = Arc::new(chat.fail_first(2));
    let enricher = enricher(searcher.clone(), chat.clone(), 2);

    let results = enricher
        .run(&entities(&["Acme Corp", "Globex"]), TEMPLATE)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(searcher.calls_for(&query("Globex")), 3);
    assert_eq!(chat.call_count(), 4);
}

#[tokio::test]
async fn exhausted_retries_abort_the_run() {
    let (searcher, chat) = backends(&[("Acme Corp", "acme@x.com")]);
    let searcher = Arc::new(searcher.fail_first(&query("Acme Corp"), 3));
    let chat = Arc::new(chat);
    let enricher = enricher(searcher.clone(), chat.clone(), 1);

    let err = enricher
        .run(&entities(&["Acme Corp"]), TEMPLATE)
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichError::Provider { .. }));
    assert_eq!(searcher.calls_for(&query("Acme Corp")), 3);
    assert_eq!(chat.call_count(), 0);
}

#[tokio::test]
async fn collecting_mode_keeps_successes_and_records_failures() {
    let (searcher, chat) = backends(&[
        ("Acme Corp", "acme@x.com"),
        ("Globex", "contact@globex.com"),
    ]);
    let searcher = searcher
        .on_query(&query("Initech"), vec![])
        .fail_first(&query("Umbrella"), 3)
        .on_query(&query("Umbrella"), vec![snippet_for("Umbrella", "press@umbrella.com")]);
    let enricher = enricher(Arc::new(searcher), Arc::new(chat), 2);

    let report = enricher
        .run_collecting(
            &entities(&["Acme Corp", "Initech", "Globex", "Umbrella"]),
            TEMPLATE,
        )
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.failures.len(), 2);

    let failed: HashMap<&str, &str> = report
        .failures
        .iter()
        .map(|f| (f.entity.as_str(), f.error.as_str()))
        .collect();
    assert_eq!(failed["Initech"], "No search results found for 'Initech'");
    assert!(failed["Umbrella"].contains("search provider error"));
}

#[tokio::test]
async fn policy_selects_run_mode() {
    let (searcher, chat) = backends(&[("Acme Corp", "acme@x.com")]);
    let searcher = Arc::new(searcher.on_query(&query("Initech"), vec![]));
    let chat = Arc::new(chat);
    let names = entities(&["Acme Corp", "Initech"]);

    let aborted = enricher(searcher.clone(), chat.clone(), 2)
        .run_with_policy(&names, TEMPLATE, FailurePolicy::AbortOnFirst)
        .await;
    assert!(aborted.is_err());

    let report = enricher(searcher, chat, 2)
        .run_with_policy(&names, TEMPLATE, FailurePolicy::CollectErrors)
        .await
        .unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.failures[0].entity, "Initech");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn template_without_placeholder_is_rejected_before_any_call() {
    let (searcher, chat) = backends(&[("Acme Corp", "acme@x.com")]);
    let searcher = Arc::new(searcher);
    let enricher = enricher(searcher.clone(), Arc::new(chat), 2);

    let err = enricher
        .run(&entities(&["Acme Corp"]), "Find the email address")
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichError::Validation(_)));
    assert_eq!(searcher.total_calls(), 0);
}

#[tokio::test]
async fn zero_concurrency_is_rejected_before_any_call() {
    let (searcher, chat) = backends(&[("Acme Corp", "acme@x.com")]);
    let searcher = Arc::new(searcher);
    let enricher = enricher(searcher.clone(), Arc::new(chat), 0);

    let err = enricher
        .run_collecting(&entities(&["Acme Corp"]), TEMPLATE)
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichError::Validation(_)));
    assert_eq!(searcher.total_calls(), 0);
}

#[tokio::test]
async fn oversized_concurrency_is_rejected_before_any_call() {
    let (searcher, chat) = backends(&[("Acme Corp", "acme@x.com")]);
    let searcher = Arc::new(searcher);
    let enricher = enricher(searcher.clone(), Arc::new(chat), usize::MAX);

    let err = enricher
        .run(&entities(&["Acme Corp"]), TEMPLATE)
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichError::Validation(_)));
    assert_eq!(searcher.total_calls(), 0);
}
