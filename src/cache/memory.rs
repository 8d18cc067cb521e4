//! In-memory TTL cache
//!
//! Values live for the lifetime of the owning `MemoryCache`. An entry with no
//! TTL never expires; otherwise it expires at write time plus TTL and is
//! purged by the first `get` that observes it expired.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::CacheStats;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

struct CacheState<V> {
    entries: HashMap<String, Entry<V>>,
    hits: u64,
    misses: u64,
    expirations: u64,
}

impl<V> Default for CacheState<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
            expirations: 0,
        }
    }
}

/// Process-lifetime key/value cache with optional per-entry expiry
///
/// Construct one at startup and share it behind an `Arc`; tests build their
/// own isolated instances.
pub struct MemoryCache<V> {
    state: RwLock<CacheState<V>>,
}

impl<V: Clone + Send + Sync> MemoryCache<V> {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Returns the value for `key` if present and not expired
    ///
    /// An expired entry is removed and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut state = self.state.write().await;

        let expired = match state.entries.get(key) {
            None => {
                state.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            state.entries.remove(key);
            state.expirations += 1;
            state.misses += 1;
            tracing::trace!(key = %key, "Cache entry expired");
            return None;
        }

        state.hits += 1;
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key`, replacing any previous entry
    ///
    /// `None` for `ttl` means the entry never expires.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        let mut state = self.state.write().await;
        state
            .entries
            .insert(key.into(), Entry { value, expires_at });
    }

    /// Removes the entry for `key`, if any
    pub async fn delete(&self, key: &str) {
        self.state.write().await.entries.remove(key);
    }

    /// Removes every entry
    pub async fn clear(&self) {
        self.state.write().await.entries.clear();
    }

    /// Number of entries held, including expired ones not yet purged
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns a snapshot of the cache counters
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            entries: state.entries.len() as u64,
            hits: state.hits,
            misses: state.misses,
            expirations: state.expirations,
        }
    }
}

impl<V: Clone + Send + Sync> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // Test 1: Set and get
    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();

        cache.set("a", 1u32, None).await;

        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.get("b").await, None);
    }

    // Test 2: Entry with TTL is served until it elapses
    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache = MemoryCache::new();
        cache.set("page", "v".to_string(), Some(Duration::from_secs(60))).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("page").await.as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("page").await, None);
    }

    // Test 3: Expired entries are purged on read
    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_purged_on_read() {
        let cache = MemoryCache::new();
        cache.set("k", 7i64, Some(Duration::from_secs(1))).await;

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.len().await, 1);

        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.len().await, 0);

        let stats = cache.stats().await;
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    // Test 4: Entry without TTL never expires
    #[tokio::test(start_paused = true)]
    async fn test_no_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache.set("forever", 1u8, None).await;

        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert_eq!(cache.get("forever").await, Some(1));
    }

    // Test 5: Set overwrites value and TTL
    #[tokio::test(start_paused = true)]
    async fn test_set_overwrites() {
        let cache = MemoryCache::new();
        cache.set("k", 1u32, Some(Duration::from_secs(1))).await;
        cache.set("k", 2u32, None).await;

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get("k").await, Some(2));
    }

    // Test 6: Delete and clear
    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = MemoryCache::new();
        cache.set("a", 1u32, None).await;
        cache.set("b", 2u32, None).await;

        cache.delete("a").await;
        cache.delete("missing").await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(2));

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    // Test 7: Hit and miss counters
    #[tokio::test]
    async fn test_stats_counters() {
        let cache = MemoryCache::new();
        cache.set("a", 1u32, None).await;

        cache.get("a").await;
        cache.get("a").await;
        cache.get("b").await;

        let stats = cache.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    // Test 8: Concurrent readers and writers share one instance
    #[tokio::test]
    async fn test_concurrent_access() {
        let cache = Arc::new(MemoryCache::new());
        let mut handles = Vec::new();

        for i in 0..10u32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.set(format!("key_{}", i), i, None).await;
                cache.get(&format!("key_{}", i)).await
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(i as u32));
        }
        assert_eq!(cache.len().await, 10);
    }
}
