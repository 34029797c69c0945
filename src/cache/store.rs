//! Response cache storage.
//!
//! Holds rendered HTTP responses for the global feed. Entries live until
//! their TTL lapses or an operator clears the store; nothing written
//! elsewhere in the system touches them.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::config::CacheConfig;
use super::keys::ResponseKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Cached HTTP response.
#[derive(Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: Instant,
}

pub struct ResponseStore {
    responses: RwLock<LruCache<ResponseKey, CachedResponse>>,
    ttl: Duration,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
            ttl: config.ttl(),
        }
    }

    /// Fetch a cached response. Entries past their TTL are dropped on
    /// access and reported as a miss.
    pub fn get(&self, key: &ResponseKey) -> Option<CachedResponse> {
        let mut responses = rw_write(&self.responses, SOURCE, "get");
        let expired = responses
            .get(key)
            .is_some_and(|entry| entry.stored_at.elapsed() >= self.ttl);
        if expired {
            responses.pop(key);
            return None;
        }
        responses.get(key).cloned()
    }

    /// Store a response, returning the key evicted to make room, if any.
    pub fn set(&self, key: ResponseKey, response: CachedResponse) -> Option<ResponseKey> {
        rw_write(&self.responses, SOURCE, "set")
            .push(key, response)
            .map(|(evicted_key, _)| evicted_key)
    }

    /// Drop every cached response.
    pub fn clear(&self) {
        rw_write(&self.responses, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
