//! Retry manager for upstream status failures with exponential backoff
//!
//! This module provides a retry mechanism with configurable backoff strategy,
//! jitter, and a bound on the total number of attempts.

use crate::config::RetryConfig;
use crate::error::RetryableError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry manager with exponential backoff support
#[derive(Debug, Clone)]
pub struct RetryManager {
    config: RetryConfig,
}

impl RetryManager {
    /// Create a new RetryManager with the given configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a RetryManager with default configuration
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Execute an async operation with retry logic
    ///
    /// The operation runs at most `max_attempts` times. Only errors whose
    /// `is_retryable()` is true are retried; anything else is returned after
    /// the attempt that produced it. When attempts run out the last error is
    /// returned.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + std::fmt::Display,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !err.is_retryable() {
                        return Err(err);
                    }

                    if attempt >= max_attempts {
                        warn!(
                            attempts = attempt,
                            max_attempts,
                            error = %err,
                            "Max attempts exhausted"
                        );
                        return Err(err);
                    }

                    let backoff = self.calculate_backoff(attempt - 1);
                    debug!(
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Retrying after upstream error"
                    );

                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Calculate the backoff before retry number `retry` (0-based)
    ///
    /// `initial * multiplier^retry`, plus up to one `initial` of random jitter,
    /// capped at `max_backoff_ms`. With a multiplier of at least 2 the
    /// sequence never decreases, jitter included; `Config::validate` rejects
    /// anything lower when jitter is on.
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        let initial = self.config.initial_backoff_ms as f64;
        let exponent = retry.min(i32::MAX as u32) as i32;
        let base = initial * self.config.backoff_multiplier.powi(exponent);

        let jittered = if self.config.jitter && initial > 0.0 {
            base + rand::thread_rng().gen_range(0.0..initial)
        } else {
            base
        };

        let capped = jittered.min(self.config.max_backoff_ms as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Total attempts allowed per operation; never less than one
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Get the retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
