//! breed-mirror - Keeps a local mirror of an upstream breed catalog in sync
//!
//! This crate provides a paginated, retrying fetch client for the upstream
//! catalog, a reconciler that applies the remote set to a local SQLite store,
//! and a TTL cache-aside read path over that store.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod sync;
pub mod telemetry;
