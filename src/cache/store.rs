use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::config::PageCacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

/// Cached HTTP response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
struct Entry {
    response: CachedResponse,
    stored_at: Instant,
}

/// LRU of rendered pages with a fixed lifetime per entry.
pub struct PageStore {
    ttl: Duration,
    entries: RwLock<LruCache<PageKey, Entry>>,
}

impl PageStore {
    pub fn new(config: &PageCacheConfig) -> Self {
        Self {
            ttl: config.ttl,
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Fresh entry for `key` as of `now`; an expired entry is dropped.
    pub fn get(&self, key: &PageKey, now: Instant) -> Option<CachedResponse> {
        let mut entries = rw_write(&self.entries, "get");
        let fresh = entries
            .get(key)
            .map(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)?;
        if fresh {
            entries.get(key).map(|entry| entry.response.clone())
        } else {
            entries.pop(key);
            None
        }
    }

    /// Store a response, returning the key evicted for capacity, if any.
    pub fn set(&self, key: PageKey, response: CachedResponse, now: Instant) -> Option<PageKey> {
        rw_write(&self.entries, "set")
            .push(
                key.clone(),
                Entry {
                    response,
                    stored_at: now,
                },
            )
            .and_then(|(evicted, _)| (evicted != key).then_some(evicted))
    }

    pub fn clear(&self) {
        rw_write(&self.entries, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
