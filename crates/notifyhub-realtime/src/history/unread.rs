//! Short-lived cache for the unread-count endpoint.

use std::time::Duration;

use moka::future::Cache;

const UNREAD_KEY: &str = "unread_count";

/// Caches the last successfully fetched unread count for a short TTL.
/// Failures are never cached.
#[derive(Debug, Clone)]
pub struct UnreadCountCache {
    cache: Cache<&'static str, u64>,
}

impl UnreadCountCache {
    /// Create a cache whose entry lives for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { cache }
    }

    /// The cached count, if still fresh.
    pub async fn get(&self) -> Option<u64> {
        self.cache.get(&UNREAD_KEY).await
    }

    /// Store a freshly fetched count.
    pub async fn put(&self, count: u64) {
        self.cache.insert(UNREAD_KEY, count).await;
    }

    /// Drop the cached count so the next read hits the backend.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&UNREAD_KEY).await;
    }
}
