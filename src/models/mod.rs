//! Domain models for breed-mirror
//!
//! This module contains the core domain models used throughout the application.

pub mod breed;
pub mod sync;

// Re-export commonly used types
pub use breed::{is_pinned_key, Breed, BreedPage, RawRecord};
pub use sync::SyncResult;
