//! Key-value cache with per-entry TTL

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

struct Entries<V> {
    map: HashMap<String, CacheEntry<V>>,
    last_purge: Instant,
}

/// Concurrent TTL cache shared by clones.
///
/// Expired entries are hidden on read and swept out by writes, at most once
/// per TTL, so the map stays bounded by what was inserted within roughly two
/// TTLs.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Arc<RwLock<Entries<V>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            entries: self.entries.clone(),
        }
    }
}

impl<V: Clone + Send + Sync> TtlCache<V> {
    /// Create a cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(Entries {
                map: HashMap::new(),
                last_purge: Instant::now(),
            })),
        }
    }

    /// Fresh value for `key`, if any
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .map
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    /// Store `value` under `key` with the default TTL
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.ttl).await;
    }

    /// Store `value` under `key` with an explicit TTL
    pub async fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if now.duration_since(entries.last_purge) >= self.ttl {
            entries.map.retain(|_, entry| entry.expires_at > now);
            entries.last_purge = now;
        }
        entries.map.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }
}
