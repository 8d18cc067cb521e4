//! Sync functionality integration tests
//!
//! Tests the synchronization system end to end against a mock upstream:
//! - Full passes into a SQLite store
//! - Idempotence and diff application across passes
//! - Failure handling (empty upstream, flaky and truncated pagination)
//! - Scheduler startup, manual trigger and status

mod common;

use std::sync::Arc;
use std::time::Duration;

use breed_mirror::config::SyncConfig;
use breed_mirror::database::RecordStore;
use breed_mirror::error::{FetchError, SyncError};
use breed_mirror::sync::{SchedulerConfig, SyncScheduler};
use common::*;
use serde_json::json;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test 1: A full pass mirrors every upstream page
#[tokio::test]
async fn test_full_pass_populates_store() {
    let server = start_upstream(&[
        page_body(&[("Akita", "a.jpg"), ("Boxer", "b.jpg")]),
        page_body(&[("Corgi", "c.jpg")]),
    ])
    .await;
    let store = create_test_store().await;
    let reconciler = create_reconciler(&server, store.clone(), &SyncConfig::default());

    let result = reconciler.run_pass().await.unwrap();

    assert_eq!(result.fetched, 3);
    assert_eq!(result.added, 3);
    assert!(!result.removals_skipped);
    assert_eq!(
        snapshot(store.as_ref()).await,
        vec![
            ("Akita".to_string(), Some("a.jpg".to_string())),
            ("Boxer".to_string(), Some("b.jpg".to_string())),
            ("Corgi".to_string(), Some("c.jpg".to_string())),
        ]
    );
}

/// Test 2: A second pass against an unchanged upstream writes nothing
#[tokio::test]
async fn test_second_pass_is_noop() {
    let server = start_upstream(&[page_body(&[("Akita", "a.jpg"), ("Boxer", "b.jpg")])]).await;
    let store = create_test_store().await;
    let reconciler = create_reconciler(&server, store.clone(), &SyncConfig::default());

    reconciler.run_pass().await.unwrap();
    let second = reconciler.run_pass().await.unwrap();

    assert!(second.is_noop());
    assert_eq!(second.unchanged, 2);
}

/// Test 3: Upstream changes become adds, updates and removals; pinned breeds stay
#[tokio::test]
async fn test_upstream_changes_are_applied() {
    let store = create_seeded_store(&[
        ("A", Some("1")),
        ("B", Some("2")),
        ("#1 Doggo", Some("pinned.jpg")),
    ])
    .await;
    let server = start_upstream(&[page_body(&[("B", "3")]), page_body(&[("C", "4")])]).await;
    let reconciler = create_reconciler(&server, store.clone(), &SyncConfig::default());

    let result = reconciler.run_pass().await.unwrap();

    assert_eq!((result.added, result.updated, result.removed), (1, 1, 1));
    assert_eq!(
        snapshot(store.as_ref()).await,
        vec![
            ("#1 Doggo".to_string(), Some("pinned.jpg".to_string())),
            ("B".to_string(), Some("3".to_string())),
            ("C".to_string(), Some("4".to_string())),
        ]
    );
}

/// Test 4: An empty upstream fails the pass and deletes nothing
#[tokio::test]
async fn test_empty_upstream_fails_pass() {
    let server = start_upstream(&[]).await;
    let store = create_seeded_store(&[("A", Some("1")), ("B", Some("2"))]).await;
    let reconciler = create_reconciler(&server, store.clone(), &SyncConfig::default());

    let result = reconciler.run_pass().await;

    assert!(matches!(
        result,
        Err(SyncError::Fetch(FetchError::NoDataFetched { .. }))
    ));
    assert_eq!(store.count().await.unwrap(), 2);
}

/// Test 5: A page that keeps failing truncates the set; removals are skipped
#[tokio::test]
async fn test_truncated_pagination_skips_removals() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dogs"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[("A", "1b")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dogs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let store = create_seeded_store(&[("A", Some("1")), ("OnPageTwo", Some("2"))]).await;
    let reconciler = create_reconciler(&server, store.clone(), &SyncConfig::default());

    let result = reconciler.run_pass().await.unwrap();

    assert_eq!(result.updated, 1);
    assert_eq!(result.removed, 0);
    assert!(result.removals_skipped);
    assert!(store.find_by_key("OnPageTwo").await.unwrap().is_some());
}

/// Test 6: Transient upstream errors are retried within the pass
#[tokio::test]
async fn test_flaky_upstream_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dogs"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_pages(&server, &[page_body(&[("Akita", "a.jpg")])]).await;

    let store = create_test_store().await;
    let reconciler = create_reconciler(&server, store.clone(), &SyncConfig::default());

    let result = reconciler.run_pass().await.unwrap();

    assert_eq!(result.added, 1);
    assert!(!result.removals_skipped);
}

/// Test 7: Duplicate keys across pages collapse to the last one
#[tokio::test]
async fn test_duplicates_across_pages() {
    let server = start_upstream(&[
        page_body(&[("Akita", "old.jpg"), ("Boxer", "b.jpg")]),
        page_body(&[("Akita", "new.jpg")]),
    ])
    .await;
    let store = create_test_store().await;
    let reconciler = create_reconciler(&server, store.clone(), &SyncConfig::default());

    let result = reconciler.run_pass().await.unwrap();

    assert_eq!(result.fetched, 2);
    assert_eq!(result.failed, 0);
    let akita = store.find_by_key("Akita").await.unwrap().unwrap();
    assert_eq!(akita.image.as_deref(), Some("new.jpg"));
}

/// Test 8: The scheduler runs the startup pass and serves manual triggers
#[tokio::test]
async fn test_scheduler_with_reconciler() {
    let server = start_upstream(&[page_body(&[("Akita", "a.jpg")])]).await;
    let store = create_test_store().await;
    let reconciler = create_reconciler(&server, store.clone(), &SyncConfig::default());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler = SyncScheduler::new(
        SchedulerConfig::default(),
        Arc::new(reconciler),
        shutdown_rx,
    );
    let handle = scheduler.manual_sync_handle();
    let scheduler_handle = tokio::spawn(scheduler.run());

    let manual = handle.trigger_sync().await.unwrap();
    assert!(manual.is_noop());

    let status = handle.status().await;
    assert_eq!(status.passes, 2);
    assert_eq!(status.failures, 0);
    assert!(store.find_by_key("Akita").await.unwrap().is_some());

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), scheduler_handle).await;
    assert!(result.is_ok());
}

/// Test 9: A failing upstream is absorbed by the scheduler
#[tokio::test]
async fn test_scheduler_absorbs_failed_pass() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "down"})))
        .mount(&server)
        .await;

    let store = create_seeded_store(&[("A", Some("1"))]).await;
    let reconciler = create_reconciler(&server, store.clone(), &SyncConfig::default());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler = SyncScheduler::new(
        SchedulerConfig::default(),
        Arc::new(reconciler),
        shutdown_rx,
    );
    let handle = scheduler.manual_sync_handle();
    let scheduler_handle = tokio::spawn(scheduler.run());

    let manual = handle.trigger_sync().await;
    assert!(matches!(
        manual,
        Err(SyncError::Fetch(FetchError::UnexpectedShape(_)))
    ));

    let status = handle.status().await;
    assert_eq!(status.failures, 2);
    assert!(matches!(status.last_result, Some(Err(_))));
    assert_eq!(store.count().await.unwrap(), 1);

    shutdown_tx.send(()).unwrap();
    let _ = scheduler_handle.await;
}
