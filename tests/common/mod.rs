//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use breed_mirror::config::{RetryConfig, SyncConfig, UpstreamConfig};
use breed_mirror::database::{RecordStore, SqliteStore};
use breed_mirror::models::RawRecord;
use breed_mirror::sync::{FetchedRecords, Reconciler, UpstreamClient};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Create an in-memory store for testing
pub async fn create_test_store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::in_memory()
            .await
            .expect("Failed to create test store"),
    )
}

/// Create a store pre-filled with `(breed, image)` pairs
pub async fn create_seeded_store(records: &[(&str, Option<&str>)]) -> Arc<SqliteStore> {
    let store = create_test_store().await;
    for (breed, image) in records {
        store
            .insert(&RawRecord::new(*breed, *image))
            .await
            .expect("Failed to seed store");
    }
    store
}

/// Upstream configuration pointing at a mock server, with fast retries
pub fn test_upstream_config(base_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        base_url: base_url.to_string(),
        resource: "dogs".to_string(),
        timeout_secs: 5,
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            backoff_multiplier: 2.0,
            jitter: false,
        },
    }
}

/// JSON body for one upstream page
pub fn page_body(records: &[(&str, &str)]) -> Value {
    Value::Array(
        records
            .iter()
            .map(|(breed, image)| json!({"breed": breed, "image": image, "video": ""}))
            .collect(),
    )
}

/// Mount `pages` as pages 1..=n followed by an empty page
pub async fn mount_pages(server: &MockServer, pages: &[Value]) {
    for (i, body) in pages.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/dogs"))
            .and(query_param("page", (i + 1).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/dogs"))
        .and(query_param("page", (pages.len() + 1).to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

/// Start a mock upstream serving `pages`
pub async fn start_upstream(pages: &[Value]) -> MockServer {
    let server = MockServer::start().await;
    mount_pages(&server, pages).await;
    server
}

/// Create a reconciler for `store` fetching from `server`
pub fn create_reconciler<S: RecordStore>(
    server: &MockServer,
    store: Arc<S>,
    sync: &SyncConfig,
) -> Reconciler<S> {
    let client = UpstreamClient::new(&test_upstream_config(&server.uri()))
        .expect("Failed to create upstream client");
    Reconciler::new(client, store, sync)
}

/// Create a reconciler that is only fed through `reconcile`
pub fn create_offline_reconciler<S: RecordStore>(store: Arc<S>) -> Reconciler<S> {
    let client = UpstreamClient::new(&UpstreamConfig::default())
        .expect("Failed to create upstream client");
    Reconciler::new(client, store, &SyncConfig::default())
}

/// A complete remote set built from `(breed, image)` pairs
pub fn fetched(records: &[(&str, &str)]) -> FetchedRecords {
    FetchedRecords {
        records: records
            .iter()
            .map(|(breed, image)| RawRecord::new(*breed, Some(*image)))
            .collect(),
        pages_fetched: 1,
        interrupted: None,
    }
}

/// Sorted `(breed, image)` snapshot of the store
pub async fn snapshot<S: RecordStore>(store: &S) -> Vec<(String, Option<String>)> {
    let mut rows: Vec<_> = store
        .list_all()
        .await
        .expect("Failed to list store")
        .into_iter()
        .map(|b| (b.breed, b.image))
        .collect();
    rows.sort();
    rows
}
