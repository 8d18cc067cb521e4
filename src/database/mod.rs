//! Record store for breed-mirror
//!
//! This module defines the record store trait and its SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{Breed, RawRecord};

/// Record store trait for breed persistence
///
/// Keys are unique; every mutation commits before it returns. It uses
/// `async_trait` for async methods and `mockall::automock` for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load every stored breed
    async fn list_all(&self) -> Result<Vec<Breed>, DbError>;

    /// Look up a breed by key
    async fn find_by_key(&self, breed: &str) -> Result<Option<Breed>, DbError>;

    /// Insert a new breed built from a remote record
    ///
    /// Fails with `ConstraintViolation` if the key already exists.
    async fn insert(&self, raw: &RawRecord) -> Result<Breed, DbError>;

    /// Apply the remote record's image to an existing breed
    async fn update(&self, breed: &Breed, raw: &RawRecord) -> Result<Breed, DbError>;

    /// Delete a breed
    async fn remove(&self, breed: &Breed) -> Result<(), DbError>;

    /// Number of stored breeds
    async fn count(&self) -> Result<u64, DbError>;

    /// A window of breeds in insertion order
    async fn list_page(&self, offset: u64, limit: u32) -> Result<Vec<Breed>, DbError>;
}
