//! SQLite implementation of the RecordStore trait
//!
//! This module provides a SQLite-based record store using rusqlite and
//! tokio-rusqlite for async operations.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::migrations::{migration_version, CREATE_SCHEMA};
use super::RecordStore;
use crate::error::DbError;
use crate::models::{Breed, RawRecord};

const IN_MEMORY: &str = ":memory:";

/// SQLite record store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a SQLite database and apply the schema
    ///
    /// The schema version is recorded in `PRAGMA user_version`.
    ///
    /// Use `:memory:` for an in-memory database or a file path for persistent
    /// storage. Missing parent directories are created.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        if path != IN_MEMORY {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
            {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    DbError::Connection(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(path).await?;

        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            conn.pragma_update(None, "user_version", migration_version())?;
            Ok(())
        })
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(IN_MEMORY).await
    }
}

fn breed_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Breed> {
    Ok(Breed {
        breed: row.get(0)?,
        image: row.get(1)?,
        updated_at: parse_datetime(row.get::<_, Option<String>>(2)?),
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list_all(&self) -> Result<Vec<Breed>, DbError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT breed, image, updated_at
                    FROM breeds
                    ORDER BY rowid
                    "#,
                )?;

                let breeds = stmt
                    .query_map([], breed_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(breeds)
            })
            .await
            .map_err(Into::into)
    }

    async fn find_by_key(&self, breed: &str) -> Result<Option<Breed>, DbError> {
        let breed = breed.to_string();

        self.conn
            .call(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT breed, image, updated_at FROM breeds WHERE breed = ?1",
                        [&breed],
                        breed_from_row,
                    )
                    .optional()?;

                Ok(result)
            })
            .await
            .map_err(Into::into)
    }

    async fn insert(&self, raw: &RawRecord) -> Result<Breed, DbError> {
        let now = Utc::now();
        let breed = raw.breed.clone();
        let image = raw.image.clone();
        let stamp = now.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO breeds (breed, image, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?3)
                    "#,
                    rusqlite::params![breed, image, stamp],
                )?;
                Ok(())
            })
            .await?;

        Ok(Breed {
            breed: raw.breed.clone(),
            image: raw.image.clone(),
            updated_at: Some(now),
        })
    }

    async fn update(&self, breed: &Breed, raw: &RawRecord) -> Result<Breed, DbError> {
        let now = Utc::now();
        let key = breed.breed.clone();
        let image = raw.image.clone();
        let stamp = now.to_rfc3339();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "UPDATE breeds SET image = ?1, updated_at = ?2 WHERE breed = ?3",
                    rusqlite::params![image, stamp, key],
                )?;
                Ok(count)
            })
            .await?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(Breed {
            breed: breed.breed.clone(),
            image: raw.image.clone(),
            updated_at: Some(now),
        })
    }

    async fn remove(&self, breed: &Breed) -> Result<(), DbError> {
        let key = breed.breed.clone();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute("DELETE FROM breeds WHERE breed = ?1", [&key])?;
                Ok(count)
            })
            .await?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn count(&self) -> Result<u64, DbError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM breeds", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Into::into)
    }

    async fn list_page(&self, offset: u64, limit: u32) -> Result<Vec<Breed>, DbError> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT breed, image, updated_at
                    FROM breeds
                    ORDER BY rowid
                    LIMIT ?1 OFFSET ?2
                    "#,
                )?;

                let breeds = stmt
                    .query_map(rusqlite::params![limit, offset], breed_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(breeds)
            })
            .await
            .map_err(Into::into)
    }
}

/// Parse an RFC 3339 or SQLite `CURRENT_TIMESTAMP` value
fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
    })
}
