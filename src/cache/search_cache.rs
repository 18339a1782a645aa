// src/cache/search_cache.rs
//! Per-user search result cache.
//!
//! Entries are keyed by (user, normalized query) and expire passively after a
//! fixed TTL. Any write by a user drops every entry that user owns. The map is
//! guarded by a single mutex and no operation awaits while holding it.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cache key: owning user plus normalized query. Kept as two fields so keys
/// of different users can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    user: String,
    query: String,
}

impl CacheKey {
    pub fn new(user: &str, query: &str) -> Self {
        Self {
            user: user.to_string(),
            query: query.to_string(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry<T> {
    key: CacheKey,
    results: Arc<Vec<T>>,
    inserted_at: Instant,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub invalidations: u64,
    pub expired: u64,
    pub entries: usize,
    pub ttl_secs: u64,
}

enum Probe<T> {
    Fresh(Arc<Vec<T>>),
    Expired,
    Corrupt,
    Absent,
}

pub struct SearchResultCache<T> {
    entries: Mutex<HashMap<CacheKey, CacheEntry<T>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    invalidations: AtomicU64,
    expired: AtomicU64,
}

impl<T> SearchResultCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the cached result set for (user, query) if present and unexpired.
    pub fn lookup(&self, user: &str, query: &str) -> Option<Arc<Vec<T>>> {
        self.lookup_at(user, query, Instant::now())
    }

    /// Same as [`lookup`](Self::lookup) with an explicit clock reading.
    pub fn lookup_at(&self, user: &str, query: &str, now: Instant) -> Option<Arc<Vec<T>>> {
        let key = CacheKey::new(user, query);
        let mut map = self.entries.lock();

        let probe = match map.get(&key) {
            None => Probe::Absent,
            // Unreachable while the map key is the entry key; guards a change
            // in how keys are derived.
            Some(entry) if entry.key != key => Probe::Corrupt,
            Some(entry) if now.saturating_duration_since(entry.inserted_at) >= self.ttl => {
                Probe::Expired
            }
            Some(entry) => Probe::Fresh(Arc::clone(&entry.results)),
        };

        match probe {
            Probe::Fresh(results) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(results)
            }
            Probe::Expired => {
                map.remove(&key);
                self.expired.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(user_id = %user, query = %query, "search cache entry expired");
                None
            }
            Probe::Corrupt => {
                // Treat as a miss and drop the entry
                map.remove(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                warn!(user_id = %user, query = %query, "search cache key mismatch, entry dropped");
                None
            }
            Probe::Absent => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite the entry for (user, query); its age restarts at zero.
    /// Returns the snapshot now held by the cache.
    pub fn store(&self, user: &str, query: &str, results: Vec<T>) -> Arc<Vec<T>> {
        self.store_at(user, query, results, Instant::now())
    }

    pub fn store_at(&self, user: &str, query: &str, results: Vec<T>, now: Instant) -> Arc<Vec<T>> {
        let key = CacheKey::new(user, query);
        let results = Arc::new(results);
        let entry = CacheEntry {
            key: key.clone(),
            results: Arc::clone(&results),
            inserted_at: now,
        };
        self.entries.lock().insert(key, entry);
        self.stores.fetch_add(1, Ordering::Relaxed);
        results
    }

    /// Drop every entry owned by `user`. Full scan over all entries; if the
    /// cache ever grows large this wants a user -> keys index instead.
    pub fn invalidate_user(&self, user: &str) -> usize {
        let removed = {
            let mut map = self.entries.lock();
            let before = map.len();
            map.retain(|key, _| key.user != user);
            before - map.len()
        };
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(user_id = %user, removed, "search cache invalidated for user");
        removed
    }

    /// Entry count, expired-but-untouched entries included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SearchCacheStats {
        SearchCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            entries: self.len(),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}
