//! Diff-and-apply reconciliation between the upstream catalog and the store
//!
//! A pass fetches every remote record, loads every local one, and applies
//! additions, image updates and removals as independent store operations.
//! A failed operation is logged and counted; the rest of the pass continues.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::http_client::{FetchedRecords, UpstreamClient};
use super::scheduler::Syncable;
use crate::config::SyncConfig;
use crate::database::RecordStore;
use crate::error::SyncError;
use crate::models::{Breed, RawRecord, SyncResult};

/// Keeps the record store in line with the upstream catalog
pub struct Reconciler<S> {
    client: UpstreamClient,
    store: Arc<S>,
    pinned_prefix: String,
    prune_on_partial_fetch: bool,
    interval: Duration,
}

impl<S: RecordStore> Reconciler<S> {
    pub fn new(client: UpstreamClient, store: Arc<S>, config: &SyncConfig) -> Self {
        Self {
            client,
            store,
            pinned_prefix: config.pinned_prefix.clone(),
            prune_on_partial_fetch: config.prune_on_partial_fetch,
            interval: config.interval(),
        }
    }

    /// Run one full pass: fetch, diff, apply
    ///
    /// Fetch failures (including an empty upstream) and a failure to read
    /// the local set end the pass before anything is written.
    pub async fn run_pass(&self) -> Result<SyncResult, SyncError> {
        let fetched = self.client.fetch_all().await?;
        self.reconcile(fetched).await
    }

    /// Apply a fetched remote set to the store
    ///
    /// Removals are skipped when pagination was interrupted, unless pruning
    /// on partial fetches is enabled.
    pub async fn reconcile(&self, fetched: FetchedRecords) -> Result<SyncResult, SyncError> {
        let complete = fetched.is_complete();
        let remote = collapse_duplicates(fetched.records);
        let local = self.store.list_all().await?;

        let local_by_key: HashMap<&str, &Breed> =
            local.iter().map(|breed| (breed.breed.as_str(), breed)).collect();

        let mut result = SyncResult {
            fetched: remote.len() as u64,
            ..Default::default()
        };

        let mut remote_keys = HashSet::with_capacity(remote.len());
        for record in &remote {
            remote_keys.insert(record.breed.as_str());

            match local_by_key.get(record.breed.as_str()) {
                None => self.add(record, &mut result).await,
                Some(existing) => match existing.image_change(record) {
                    Some(image) => self.update(existing, record, image, &mut result).await,
                    None => result.unchanged += 1,
                },
            }
        }

        if complete || self.prune_on_partial_fetch {
            for breed in local.iter().filter(|b| !remote_keys.contains(b.breed.as_str())) {
                if breed.is_pinned(&self.pinned_prefix) {
                    debug!(breed = %breed.breed, "Keeping pinned breed");
                    continue;
                }
                self.remove(breed, &mut result).await;
            }
        } else {
            warn!(
                fetched = result.fetched,
                "Remote set is incomplete, skipping removals"
            );
            result.removals_skipped = true;
        }

        info!(
            fetched = result.fetched,
            added = result.added,
            updated = result.updated,
            removed = result.removed,
            unchanged = result.unchanged,
            failed = result.failed,
            removals_skipped = result.removals_skipped,
            "Reconciliation finished"
        );

        Ok(result)
    }

    async fn add(&self, record: &RawRecord, result: &mut SyncResult) {
        match self.store.insert(record).await {
            Ok(_) => {
                info!(breed = %record.breed, "Added breed");
                result.added += 1;
            }
            Err(err) => {
                warn!(breed = %record.breed, error = %err, "Failed to add breed");
                result.failed += 1;
            }
        }
    }

    async fn update(&self, existing: &Breed, record: &RawRecord, image: &str, result: &mut SyncResult) {
        match self.store.update(existing, record).await {
            Ok(_) => {
                info!(breed = %record.breed, image = %image, "Updated breed image");
                result.updated += 1;
            }
            Err(err) => {
                warn!(breed = %record.breed, error = %err, "Failed to update breed");
                result.failed += 1;
            }
        }
    }

    async fn remove(&self, breed: &Breed, result: &mut SyncResult) {
        match self.store.remove(breed).await {
            Ok(()) => {
                info!(breed = %breed.breed, "Removed breed");
                result.removed += 1;
            }
            Err(err) => {
                warn!(breed = %breed.breed, error = %err, "Failed to remove breed");
                result.failed += 1;
            }
        }
    }
}

#[async_trait]
impl<S: RecordStore + 'static> Syncable for Reconciler<S> {
    fn name(&self) -> &str {
        self.client.resource()
    }

    fn sync_interval(&self) -> Duration {
        self.interval
    }

    async fn sync(&self) -> Result<SyncResult, SyncError> {
        self.run_pass().await
    }
}

/// Collapse records sharing a key; the last one observed wins and keeps the
/// position of the first
fn collapse_duplicates(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<RawRecord> = Vec::with_capacity(records.len());

    for record in records {
        if record.breed.is_empty() {
            warn!("Ignoring remote record without a breed name");
            continue;
        }

        match index.get(&record.breed) {
            Some(&position) => {
                debug!(breed = %record.breed, "Duplicate remote record, keeping the later one");
                unique[position] = record;
            }
            None => {
                index.insert(record.breed.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}
