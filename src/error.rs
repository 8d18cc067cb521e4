//! Application error types for breed-mirror
//!
//! This module defines the error types used by the fetch pipeline, the record
//! store and the reconciliation pass. All error types use `thiserror`.

use thiserror::Error;

/// Errors raised while talking to the upstream catalog API
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    /// Network-level failure: connection refused, DNS, timeout, broken body
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status
    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    /// Every attempt for a page ended in a non-2xx status
    #[error("Upstream returned HTTP {status} after {attempts} attempts")]
    RetriesExhausted { status: u16, attempts: u32 },

    /// The body decoded, but not to a JSON array
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// The body or one of its records could not be decoded
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Pagination finished without a single record
    #[error("No records were fetched from resource '{resource}'")]
    NoDataFetched { resource: String },

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Returns true for failures that end pagination early but keep the
    /// records aggregated so far
    pub fn aborts_pagination(&self) -> bool {
        matches!(
            self,
            FetchError::Transport(_)
                | FetchError::RetriesExhausted { .. }
                | FetchError::UnexpectedShape(_)
                | FetchError::Decode(_)
        )
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// The background connection is gone or refused the call
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::ConstraintViolation(err.to_string())
            }
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound,
            other => DbError::Sqlite(other),
        }
    }
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => e.into(),
            other => DbError::Connection(other.to_string()),
        }
    }
}

/// Errors that end a synchronization pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fetching the remote record set failed
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Reading the local record set failed
    #[error("Store failed: {0}")]
    Store(#[from] DbError),

    /// The pass did not finish in time
    #[error("Sync timed out after {0} seconds")]
    TimedOut(u64),

    /// The scheduler is not running or dropped the request
    #[error("Scheduler unavailable: {0}")]
    SchedulerUnavailable(String),
}

/// Logging setup errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed or could not be built
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Trait for determining if an error is retryable
pub trait RetryableError {
    /// Returns true if the error is retryable
    fn is_retryable(&self) -> bool;
}

impl RetryableError for FetchError {
    fn is_retryable(&self) -> bool {
        // Only HTTP status failures are retried; transport errors surface at once.
        matches!(self, FetchError::Status(_))
    }
}
