//! Sync scheduler for the periodic reconciliation pass
//!
//! One task runs every pass: once at startup, then sleep-then-sync on a fixed
//! interval. Manual passes run inline in the same task, so passes never
//! overlap. This is the only place pass failures are logged and absorbed.

use crate::error::SyncError;
use crate::models::SyncResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info};

use crate::config::SyncConfig;

/// Configuration for the sync scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay before the startup pass (seconds)
    pub initial_delay_secs: u64,
    /// Upper bound for a single pass (seconds)
    pub sync_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 0,
            sync_timeout_secs: 900,
        }
    }
}

impl From<&SyncConfig> for SchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            initial_delay_secs: config.initial_delay_secs,
            sync_timeout_secs: config.timeout_secs,
        }
    }
}

/// Status of the scheduled source
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    /// When the last pass finished
    pub last_sync: Option<SystemTime>,
    /// Last pass result
    pub last_result: Option<Result<SyncResult, String>>,
    /// Next scheduled pass
    pub next_sync: Option<SystemTime>,
    /// Whether a pass is currently running
    pub in_progress: bool,
    /// Passes finished, failed ones included
    pub passes: u64,
    /// Passes that failed or timed out
    pub failures: u64,
}

/// A source the scheduler can synchronize
#[async_trait]
pub trait Syncable: Send + Sync {
    /// Get the name of this source
    fn name(&self) -> &str;

    /// Get the sync interval for this source
    fn sync_interval(&self) -> Duration;

    /// Perform one synchronization pass
    async fn sync(&self) -> Result<SyncResult, SyncError>;
}

/// Manual sync request
struct ManualSyncRequest {
    response: oneshot::Sender<Result<SyncResult, SyncError>>,
}

/// Periodic scheduler for a single source
pub struct SyncScheduler {
    config: SchedulerConfig,
    source: Arc<dyn Syncable>,
    status: Arc<RwLock<SyncStatus>>,
    shutdown_rx: broadcast::Receiver<()>,
    manual_sync_rx: mpsc::Receiver<ManualSyncRequest>,
    manual_sync_tx: mpsc::Sender<ManualSyncRequest>,
}

impl SyncScheduler {
    /// Create a new sync scheduler
    pub fn new(
        config: SchedulerConfig,
        source: Arc<dyn Syncable>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let (manual_sync_tx, manual_sync_rx) = mpsc::channel(8);

        Self {
            config,
            source,
            status: Arc::new(RwLock::new(SyncStatus::default())),
            shutdown_rx,
            manual_sync_rx,
            manual_sync_tx,
        }
    }

    /// Get a handle for triggering manual syncs and reading status
    pub fn manual_sync_handle(&self) -> ManualSyncHandle {
        ManualSyncHandle {
            tx: self.manual_sync_tx.clone(),
            status: self.status.clone(),
        }
    }

    /// Get the current sync status
    pub async fn get_status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// Run the scheduler until the shutdown signal
    ///
    /// A pass in flight when the signal arrives is abandoned.
    pub async fn run(mut self) {
        let name = self.source.name().to_string();
        let interval = self.source.sync_interval();
        info!(
            source = %name,
            interval_secs = interval.as_secs(),
            "Starting sync scheduler"
        );

        if self.config.initial_delay_secs > 0 {
            debug!(
                delay_secs = self.config.initial_delay_secs,
                "Waiting for initial delay"
            );
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping sync scheduler");
                    return;
                }
                _ = sleep(Duration::from_secs(self.config.initial_delay_secs)) => {}
            }
        }

        info!(source = %name, "Performing initial sync");
        if self.run_pass().await.is_none() {
            info!("Sync scheduler stopped");
            return;
        }

        let mut next = self.schedule_next(interval).await;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping sync scheduler");
                    break;
                }
                Some(request) = self.manual_sync_rx.recv() => {
                    info!(source = %name, "Manual sync triggered");
                    match self.run_pass().await {
                        Some(result) => {
                            let _ = request.response.send(result);
                        }
                        None => {
                            let _ = request.response.send(Err(SyncError::SchedulerUnavailable(
                                "scheduler is shutting down".to_string(),
                            )));
                            break;
                        }
                    }
                }
                _ = sleep_until(next) => {
                    info!(source = %name, "Performing scheduled sync");
                    if self.run_pass().await.is_none() {
                        break;
                    }
                    next = self.schedule_next(interval).await;
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    /// Run one pass unless shutdown arrives first
    ///
    /// Returns `None` when the pass was abandoned for shutdown.
    async fn run_pass(&mut self) -> Option<Result<SyncResult, SyncError>> {
        tokio::select! {
            result = Self::perform_sync(&self.source, &self.status, &self.config) => Some(result),
            _ = self.shutdown_rx.recv() => {
                info!("Shutdown signal received, abandoning sync in progress");
                self.status.write().await.in_progress = false;
                None
            }
        }
    }

    async fn schedule_next(&self, interval: Duration) -> Instant {
        self.status.write().await.next_sync = Some(SystemTime::now() + interval);
        debug!(
            source = %self.source.name(),
            interval_secs = interval.as_secs(),
            "Scheduled next sync"
        );
        Instant::now() + interval
    }

    async fn perform_sync(
        source: &Arc<dyn Syncable>,
        status: &Arc<RwLock<SyncStatus>>,
        config: &SchedulerConfig,
    ) -> Result<SyncResult, SyncError> {
        let name = source.name().to_string();

        status.write().await.in_progress = true;

        let result =
            match tokio::time::timeout(Duration::from_secs(config.sync_timeout_secs), source.sync())
                .await
            {
                Ok(result) => result,
                Err(_) => Err(SyncError::TimedOut(config.sync_timeout_secs)),
            };

        let mut s = status.write().await;
        s.in_progress = false;
        s.last_sync = Some(SystemTime::now());
        s.passes += 1;

        match &result {
            Ok(sync_result) => {
                if sync_result.is_noop() {
                    debug!(source = %name, "Sync completed, nothing changed");
                } else {
                    info!(
                        source = %name,
                        added = sync_result.added,
                        updated = sync_result.updated,
                        removed = sync_result.removed,
                        failed = sync_result.failed,
                        "Sync completed"
                    );
                }
                s.last_result = Some(Ok(sync_result.clone()));
            }
            Err(err) => {
                error!(source = %name, error = %err, "Sync failed, retrying next interval");
                s.failures += 1;
                s.last_result = Some(Err(err.to_string()));
            }
        }

        result
    }
}

/// Handle for triggering manual syncs
#[derive(Clone)]
pub struct ManualSyncHandle {
    tx: mpsc::Sender<ManualSyncRequest>,
    status: Arc<RwLock<SyncStatus>>,
}

impl ManualSyncHandle {
    /// Run a pass now, after any pass already in progress
    pub async fn trigger_sync(&self) -> Result<SyncResult, SyncError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(ManualSyncRequest {
                response: response_tx,
            })
            .await
            .map_err(|_| SyncError::SchedulerUnavailable("scheduler not running".to_string()))?;

        response_rx.await.map_err(|_| {
            SyncError::SchedulerUnavailable("no response from scheduler".to_string())
        })?
    }

    /// Get the current sync status
    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }
}
