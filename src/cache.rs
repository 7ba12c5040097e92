//! Small TTL cache for listing results.
//!
//! Entries expire a fixed time after insertion as measured by the injected
//! [`Clock`]. Owners invalidate explicitly whenever the underlying data
//! changes; expiry only bounds how stale an entry can get when something else
//! writes to the same directory.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::Clock;

/// Default time-to-live for cached pages (30 seconds)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

struct CachedEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

impl<V> CachedEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.inserted_at).to_std() {
            Ok(age) => age > ttl,
            // Clock moved backwards: treat as expired
            Err(_) => true,
        }
    }
}

pub struct ListCache<K, V> {
    entries: RwLock<HashMap<K, CachedEntry<V>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<K, V> ListCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `key`, dropping it if it has expired
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now, self.ttl) => {
                    return Some(entry.value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now, self.ttl))
        {
            entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let entry = CachedEntry {
            value,
            inserted_at: self.clock.now(),
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
    }

    pub fn invalidate(&self, key: &K) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn invalidate_all(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|entry| !entry.is_expired(now, self.ttl))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
