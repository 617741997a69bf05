//! In-process cache backed by `moka`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use super::{CacheError, KeyValueCache};

/// Upper bound on cached entries.
const MAX_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after its own TTL, restarting it on overwrite.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Process-local cache. Entries are not shared with other processes.
#[derive(Clone)]
pub struct LocalCache {
    entries: Cache<String, Entry>,
}

impl LocalCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_CAPACITY)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueCache for LocalCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).await.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(key.to_owned(), Entry { value, ttl }).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = LocalCache::new();
        assert_eq!(cache.get("user:1").await.unwrap(), None);

        cache
            .set("user:1", "alex".to_owned(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("user:1").await.unwrap().as_deref(), Some("alex"));

        cache.delete("user:1").await.unwrap();
        assert_eq!(cache.get("user:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_their_ttl() {
        let cache = LocalCache::new();
        cache
            .set("short", "a".to_owned(), Duration::from_millis(50))
            .await
            .unwrap();
        cache
            .set("long", "b".to_owned(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("b"));
    }
}
