//! Cache-aside storage for breed-mirror
//!
//! The read path consults this cache before the record store. Entries expire
//! lazily on read; nothing invalidates them explicitly.

mod memory;

pub use memory::MemoryCache;

use serde::{Deserialize, Serialize};

/// Statistics about cache usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries currently held (expired ones included until read)
    pub entries: u64,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses, expirations included
    pub misses: u64,
    /// Number of entries purged because they had expired
    pub expirations: u64,
}

impl CacheStats {
    /// Creates new empty cache statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: Empty stats
    #[test]
    fn test_cache_stats_new() {
        let stats = CacheStats::new();

        assert_eq!(stats.entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    // Test 2: Hit rate
    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            entries: 4,
            hits: 3,
            misses: 1,
            expirations: 0,
        };

        assert!((stats.hit_rate() - 75.0).abs() < f64::EPSILON);
    }
}
