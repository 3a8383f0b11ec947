//! In-memory response cache with a freshness window

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::constants::CACHE_TTL_SECS;

/// Cached value and the moment it was stored
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    inserted_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

/// Short-lived cache keyed by request signature
///
/// Expired entries are dropped lazily when looked up; there is no background
/// sweep. Cloning the cache shares the underlying map.
#[derive(Debug, Clone)]
pub struct ResponseCache<T> {
    entries: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,
    ttl: Duration,
}

impl<T: Clone> ResponseCache<T> {
    /// Creates an empty cache
    ///
    /// # Arguments
    /// * `ttl` - How long an entry stays valid after insertion
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value for `key` if it is still fresh
    ///
    /// A stale entry is evicted and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<T> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_fresh(self.ttl) => return Some(entry.data.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Re-check: another writer may have refreshed it in between
        if let Some(entry) = entries.get(key) {
            if entry.is_fresh(self.ttl) {
                return Some(entry.data.clone());
            }
            entries.remove(key);
            tracing::debug!(key, "Evicted expired cache entry");
        }
        None
    }

    /// Stores `data` under `key`, replacing any previous entry
    pub async fn put(&self, key: impl Into<String>, data: T) {
        let key = key.into();
        tracing::debug!(key = %key, "Cached response");
        self.entries.write().await.insert(
            key,
            CacheEntry {
                data,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, fresh or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl<T: Clone> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new(Duration::from_secs(CACHE_TTL_SECS))
    }
}

/// Deterministic signature of a request
///
/// Parameters are serialized in key order, so the same parameter set always
/// produces the same key regardless of insertion order.
pub fn cache_key<V: Serialize>(prefix: &str, params: &BTreeMap<&str, V>) -> String {
    let encoded = serde_json::to_string(params).unwrap_or_default();
    format!("{}_{}", prefix, encoded)
}
