//! Bounded LRU cache of conditional-GET responses.
//!
//! The cache stores the `ETag` and body of successful GET responses so
//! repeated reads can be answered by a 304 round trip instead of a full
//! transfer. It is the only mutable state shared between request tasks;
//! access is serialized through one lock. Entries are keyed by URL plus a
//! fingerprint of the bearer token so responses never leak across token
//! scopes.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Default capacity, matching the sizing this service has always run with.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

/// A cached GET response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub etag: String,
    pub body: serde_json::Value,
}

struct CacheInner {
    entries: HashMap<String, CachedResponse>,
    /// Keys ordered least-recently-used first.
    recency: VecDeque<String>,
}

/// Concurrency-safe, capacity-bounded LRU store.
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    /// Create a cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: VecDeque::new(),
            }),
        }
    }

    /// Cache key for a request: URL plus a token fingerprint. The token
    /// itself is never stored.
    pub fn cache_key(url: &str, token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        format!("{}#{}", url, &hex::encode(digest)[..16])
    }

    /// Look up an entry, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut inner = self.lock();
        let hit = inner.entries.get(key).cloned();
        if hit.is_some() {
            Self::touch(&mut inner.recency, key);
        }
        hit
    }

    /// Insert or replace an entry, evicting the least-recently-used entry
    /// when the cache is full.
    pub fn insert(&self, key: String, response: CachedResponse) {
        let mut inner = self.lock();

        if inner.entries.insert(key.clone(), response).is_some() {
            Self::touch(&mut inner.recency, &key);
            return;
        }

        inner.recency.push_back(key);
        while inner.entries.len() > self.capacity {
            if let Some(oldest) = inner.recency.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move `key` to the most-recently-used position.
    fn touch(recency: &mut VecDeque<String>, key: &str) {
        if let Some(position) = recency.iter().position(|k| k == key) {
            if let Some(k) = recency.remove(position) {
                recency.push_back(k);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        // A poisoned lock only means a panic mid-update elsewhere; the map
        // and queue are still structurally sound, so recover the guard.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
