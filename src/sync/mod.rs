//! Upstream synchronization
//!
//! This module keeps the record store in line with the upstream catalog.
//!
//! # Components
//!
//! - [`retry`]: Retry manager with exponential backoff for upstream status failures
//! - [`http_client`]: Paginated client for the upstream catalog
//! - [`reconciler`]: Diff-and-apply pass from the remote set to the store
//! - [`scheduler`]: Startup and fixed-interval passes, manual trigger, status
//!
//! # Example
//!
//! ```ignore
//! use breed_mirror::sync::{Reconciler, SchedulerConfig, SyncScheduler, UpstreamClient};
//!
//! let client = UpstreamClient::new(&config.upstream)?;
//! let reconciler = Reconciler::new(client, store, &config.sync);
//! let scheduler = SyncScheduler::new(
//!     SchedulerConfig::from(&config.sync),
//!     Arc::new(reconciler),
//!     shutdown_rx,
//! );
//! tokio::spawn(scheduler.run());
//! ```

pub mod http_client;
pub mod reconciler;
pub mod retry;
pub mod scheduler;

// Re-export main types for convenience
pub use http_client::{FetchedRecords, UpstreamClient};
pub use reconciler::Reconciler;
pub use retry::RetryManager;
pub use scheduler::{ManualSyncHandle, SchedulerConfig, SyncScheduler, SyncStatus, Syncable};
