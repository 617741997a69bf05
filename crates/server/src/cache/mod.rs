//! Cache-aside layer for users and products.
//!
//! Reads check the cache first and populate it on a miss; creates populate
//! it; updates and deletes invalidate. Values are the JSON-serialized
//! entities under `user:<id>` and `product:<id>`.
//!
//! ## Backends
//!
//! - [`RedisCache`]: shared across server and worker processes
//!   (`SET EX` / `GET` / `DEL`)
//! - [`LocalCache`]: in-process `moka` cache, used when `REDIS_URL` is unset
//!
//! Cache failures never fail the wrapped operation. They are logged at
//! `warn` and treated as a miss; the store stays authoritative.

pub mod local;
pub mod redis;
pub mod stores;

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use local::LocalCache;
pub use self::redis::RedisCache;
pub use stores::{CachedProductStore, CachedUserStore};

/// How long a cached user stays fresh.
pub const USER_TTL: Duration = Duration::from_secs(3600);

/// How long a cached product stays fresh.
pub const PRODUCT_TTL: Duration = Duration::from_secs(600);

/// Errors from a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Could not build the connection pool.
    #[error("failed to create cache pool: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    /// Could not check out a connection.
    #[error("cache pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// The backend rejected a command.
    #[error("cache command failed: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// A cached value could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A string key-value store with per-entry expiry.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// No-op if the key is missing.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Typed, failure-swallowing view of a [`KeyValueCache`] for one entity kind.
#[derive(Clone)]
pub struct CacheAside {
    cache: Arc<dyn KeyValueCache>,
    prefix: &'static str,
    ttl: Duration,
}

impl CacheAside {
    /// Keys are `<prefix>:<id>`, entries live for `ttl`.
    #[must_use]
    pub fn new(cache: Arc<dyn KeyValueCache>, prefix: &'static str, ttl: Duration) -> Self {
        Self { cache, prefix, ttl }
    }

    /// The cache key for `id`.
    #[must_use]
    pub fn key(&self, id: impl Display) -> String {
        format!("{}:{id}", self.prefix)
    }

    /// Returns the cached value, or `None` on a miss or any cache failure.
    pub async fn get<T: DeserializeOwned>(&self, id: impl Display) -> Option<T> {
        let key = self.key(id);
        let raw = match self.cache.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key = %key, "cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, "cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "corrupt cache entry, dropping");
                self.invalidate_key(&key).await;
                None
            }
        }
    }

    /// Stores `value` under `id`. Failures are logged.
    pub async fn put<T: Serialize + Sync>(&self, id: impl Display, value: &T) {
        let key = self.key(id);
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.cache.set(&key, raw, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }

    /// Removes the entry for `id`. Failures are logged.
    pub async fn invalidate(&self, id: impl Display) {
        let key = self.key(id);
        self.invalidate_key(&key).await;
    }

    async fn invalidate_key(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            tracing::warn!(key = %key, error = %e, "cache invalidation failed");
        }
    }
}

/// Pool size for the shared cache connection pool.
const REDIS_POOL_SIZE: usize = 16;

/// Pick the cache backend: Redis when `redis_url` is set, otherwise an
/// in-process cache private to this process.
///
/// # Errors
///
/// Returns `CacheError::CreatePool` if the Redis URL is invalid.
pub fn connect(redis_url: Option<&SecretString>) -> Result<Arc<dyn KeyValueCache>, CacheError> {
    match redis_url {
        Some(url) => {
            let pool = self::redis::create_pool(url.expose_secret(), REDIS_POOL_SIZE)?;
            tracing::info!("Using Redis cache");
            Ok(Arc::new(RedisCache::new(pool)))
        }
        None => {
            tracing::info!("REDIS_URL not set, using in-process cache");
            Ok(Arc::new(LocalCache::new()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A backend that fails every call.
    struct Unreachable;

    #[async_trait]
    impl KeyValueCache for Unreachable {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Serialization(serde::de::Error::custom("down")))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Serialization(serde::de::Error::custom("down")))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Serialization(serde::de::Error::custom("down")))
        }
    }

    #[test]
    fn test_key_layout() {
        let cache = CacheAside::new(Arc::new(LocalCache::new()), "user", USER_TTL);
        assert_eq!(cache.key(7), "user:7");
    }

    #[tokio::test]
    async fn test_failures_read_as_miss() {
        let cache = CacheAside::new(Arc::new(Unreachable), "product", PRODUCT_TTL);
        cache.put(1, &"value").await;
        cache.invalidate(1).await;
        assert_eq!(cache.get::<String>(1).await, None);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_dropped() {
        let backend = Arc::new(LocalCache::new());
        backend
            .set("product:1", "{not json".to_owned(), PRODUCT_TTL)
            .await
            .ok();

        let cache = CacheAside::new(backend.clone(), "product", PRODUCT_TTL);
        assert_eq!(cache.get::<Vec<u32>>(1).await, None);
        assert!(matches!(backend.get("product:1").await, Ok(None)));
    }

    #[tokio::test]
    async fn test_connect_without_redis_is_local() {
        let cache = connect(None).unwrap();
        cache.set("k", "v".to_owned(), USER_TTL).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_round_trip() {
        let cache = CacheAside::new(Arc::new(LocalCache::new()), "product", PRODUCT_TTL);
        cache.put(3, &vec![1_u32, 2, 3]).await;
        assert_eq!(cache.get::<Vec<u32>>(3).await, Some(vec![1, 2, 3]));

        cache.invalidate(3).await;
        assert_eq!(cache.get::<Vec<u32>>(3).await, None);
    }
}
