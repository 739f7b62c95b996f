//! Integration tests for the crawl pipeline
//!
//! These tests verify that:
//! 1. Logs already in storage are never fetched or announced again
//! 2. A failed listing aborts the run before any log is touched
//! 3. Fetch and save failures stop the item before the notification
//! 4. Every discovered log ends in exactly one terminal state
//! 5. The worker pool bounds the number of concurrent downloads

mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{MemoryStorage, RecordingNotifier, ScriptedSource, StubSummarizer};
use mjlog_domain::ingestion::{FetchError, IngestionPipeline, ItemId, PipelineConfig, PipelineError};

type TestPipeline = IngestionPipeline<MemoryStorage, ScriptedSource, StubSummarizer, RecordingNotifier>;

fn build(
    storage: &MemoryStorage,
    source: &ScriptedSource,
    notifier: &RecordingNotifier,
    config: PipelineConfig,
) -> TestPipeline {
    IngestionPipeline::new(
        storage.clone(),
        source.clone(),
        StubSummarizer,
        notifier.clone(),
        config,
    )
}

fn ids(values: &[&str]) -> HashSet<ItemId> {
    values.iter().map(|v| ItemId::from(*v)).collect()
}

#[tokio::test]
async fn test_existing_logs_are_skipped_without_side_effects() {
    let storage = MemoryStorage::new();
    for id in ["a", "b", "c", "d"] {
        storage.preload(id);
    }
    let source = ScriptedSource::with_candidates(&["a", "b", "c", "d"]);
    let notifier = RecordingNotifier::default();

    let report = build(&storage, &source, &notifier, PipelineConfig::default())
        .run()
        .await
        .expect("run should succeed");

    assert_eq!(report.discovered, 4);
    assert_eq!(report.skipped, 4);
    assert!(report.failed.is_empty());
    assert_eq!(source.fetch_calls(), 0);
    assert_eq!(storage.save_calls(), 0);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_discovery_failure_aborts_run() {
    let storage = MemoryStorage::new();
    let source = ScriptedSource::failing_listing(FetchError::status(
        503,
        "https://tenhou.net/0/log/find.cgi?un=someone",
    ));
    let notifier = RecordingNotifier::default();

    let err = build(&storage, &source, &notifier, PipelineConfig::default())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Discovery(FetchError::Status { status: 503, .. })));
    assert!(err.failed_items().is_empty());
    assert_eq!(storage.exists_calls(), 0);
    assert_eq!(source.fetch_calls(), 0);
}

#[tokio::test]
async fn test_fetch_failure_stops_before_save() {
    let storage = MemoryStorage::new();
    let source = ScriptedSource::with_candidates(&["broken"]);
    source.fail_fetch_of("broken");
    let notifier = RecordingNotifier::default();

    let err = build(&storage, &source, &notifier, PipelineConfig::default())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.failed_items(), &[ItemId::from("broken")]);
    assert_eq!(storage.save_calls(), 0);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_save_failure_is_never_announced() {
    let storage = MemoryStorage::new();
    storage.fail_save_of("unsaved");
    let source = ScriptedSource::with_candidates(&["unsaved"]);
    let notifier = RecordingNotifier::default();

    let err = build(&storage, &source, &notifier, PipelineConfig::default())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.failed_items(), &[ItemId::from("unsaved")]);
    assert!(!storage.contains("unsaved"));
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_mixed_run_reaches_one_terminal_state_per_log() {
    let storage = MemoryStorage::new();
    storage.preload("old-1");
    storage.preload("old-2");
    storage.fail_save_of("save-fails");
    let source =
        ScriptedSource::with_candidates(&["old-1", "old-2", "fetch-fails", "save-fails", "fresh"]);
    source.fail_fetch_of("fetch-fails");
    let notifier = RecordingNotifier::default();

    let err = build(&storage, &source, &notifier, PipelineConfig::default())
        .run()
        .await
        .unwrap_err();

    let aggregate = match err {
        PipelineError::ItemsFailed(aggregate) => aggregate,
        other => panic!("expected ItemsFailed, got {:?}", other),
    };
    let failed: HashSet<ItemId> = aggregate.failed.iter().cloned().collect();
    assert_eq!(failed, ids(&["fetch-fails", "save-fails"]));
    assert_eq!(aggregate.len(), 2, "no item may be reported twice");

    assert_eq!(storage.len(), 3);
    assert!(storage.contains("old-1"));
    assert!(storage.contains("old-2"));
    assert!(storage.contains("fresh"));
    assert!(!storage.contains("fetch-fails"));
    assert!(!storage.contains("save-fails"));

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("http://tenhou.net/0/?log=fresh\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_caps_concurrent_fetches() {
    let candidates: Vec<String> = (0..100).map(|i| format!("log-{:03}", i)).collect();
    let candidate_refs: Vec<&str> = candidates.iter().map(String::as_str).collect();

    let storage = MemoryStorage::new();
    let source = ScriptedSource::with_candidates(&candidate_refs)
        .with_fetch_delay(Duration::from_millis(5));
    let notifier = RecordingNotifier::default();
    let config = PipelineConfig {
        workers: 10,
        ..Default::default()
    };

    let report = build(&storage, &source, &notifier, config)
        .run()
        .await
        .expect("run should succeed");

    assert_eq!(report.ingested, 100);
    assert_eq!(source.fetch_calls(), 100);
    assert!(
        source.max_concurrent_fetches() <= 10,
        "observed {} concurrent fetches",
        source.max_concurrent_fetches()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_small_pool_is_respected() {
    let candidates: Vec<String> = (0..30).map(|i| format!("log-{}", i)).collect();
    let candidate_refs: Vec<&str> = candidates.iter().map(String::as_str).collect();

    let storage = MemoryStorage::new();
    let source = ScriptedSource::with_candidates(&candidate_refs)
        .with_fetch_delay(Duration::from_millis(2));
    let notifier = RecordingNotifier::default();
    let config = PipelineConfig {
        workers: 3,
        ..Default::default()
    };

    build(&storage, &source, &notifier, config)
        .run()
        .await
        .expect("run should succeed");

    assert!(source.max_concurrent_fetches() <= 3);
    assert_eq!(storage.len(), 30);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let storage = MemoryStorage::new();
    let source = ScriptedSource::with_candidates(&["a", "b", "c"]);
    let notifier = RecordingNotifier::default();

    let first = build(&storage, &source, &notifier, PipelineConfig::default())
        .run()
        .await
        .expect("first run should succeed");
    assert_eq!(first.ingested, 3);
    assert_eq!(source.fetch_calls(), 3);
    assert_eq!(notifier.messages().len(), 3);

    // A fresh pipeline instance only shares the durable storage
    let second = build(&storage, &source, &notifier, PipelineConfig::default())
        .run()
        .await
        .expect("second run should succeed");

    assert_eq!(second.skipped, 3);
    assert_eq!(second.ingested, 0);
    assert_eq!(source.fetch_calls(), 3);
    assert_eq!(notifier.messages().len(), 3);
    assert_ne!(first.run_id, second.run_id);
}
