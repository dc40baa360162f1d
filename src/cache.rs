//! Short-lived key/value cache.
//!
//! Values expire after a per-entry TTL. Expired entries are dropped lazily
//! on access.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// A TTL cache shared between requests.
pub trait Cache<V>: Send + Sync {
    /// Live value for `key`, if any.
    fn get(&self, key: &str) -> Option<V>;

    /// Store `value`, replacing whatever was there.
    fn set(&self, key: &str, value: V, ttl: Duration);

    /// Store `value` only if `key` holds no live value. Returns true if stored.
    fn add(&self, key: &str, value: V, ttl: Duration) -> bool;
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// In-process [`Cache`] backed by a `DashMap`.
pub struct MemoryCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Drop every expired entry.
    pub fn prune(&self) {
        self.entries.retain(|_, entry| entry.is_live());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.is_live() => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        // Expired. The read guard is released above, so this cannot deadlock.
        self.entries.remove_if(key, |_, entry| !entry.is_live());
        None
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn add(&self, key: &str, value: V, ttl: Duration) -> bool {
        let fresh = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    return false;
                }
                occupied.insert(fresh);
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                true
            }
        }
    }
}
