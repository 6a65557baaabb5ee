pub mod keys;
pub mod memory;
pub mod redis_cache;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

/// The cache behind the data provider. Failures are logged and treated as
/// misses; callers always fall back to the database.
pub enum CacheLayer {
    Memory(MemoryCache),
    Redis(RedisCache),
}

impl CacheLayer {
    pub fn memory() -> Self {
        Self::Memory(MemoryCache::new())
    }

    /// Connects to Redis when a URL is configured, otherwise (or when the
    /// connection fails) uses the in-process cache.
    pub async fn from_url(redis_url: Option<&str>) -> Self {
        let Some(url) = redis_url else {
            return Self::memory();
        };
        match RedisCache::connect(url).await {
            Ok(cache) => {
                tracing::info!("redis cache connected");
                Self::Redis(cache)
            }
            Err(err) => {
                tracing::warn!(error = %err, "redis unavailable, using in-memory cache");
                Self::memory()
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }

    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let payload = match self {
            Self::Memory(cache) => cache.get_raw(key),
            Self::Redis(cache) => match cache.get_raw(key).await {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(error = %err, key, "cache read failed");
                    None
                }
            },
        }?;
        serde_json::from_str(&payload).ok()
    }

    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration, tags: &[String])
    where
        T: Serialize,
    {
        if ttl.is_zero() {
            return;
        }
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(_) => return,
        };
        match self {
            Self::Memory(cache) => cache.set_raw(key, payload, ttl, tags),
            Self::Redis(cache) => {
                if let Err(err) = cache.set_raw(key, payload, ttl, tags).await {
                    tracing::warn!(error = %err, key, "cache write failed");
                }
            }
        }
    }

    pub async fn invalidate_tag(&self, tag: &str) {
        let removed = match self {
            Self::Memory(cache) => cache.invalidate_tag(tag),
            Self::Redis(cache) => match cache.invalidate_tag(tag).await {
                Ok(removed) => removed,
                Err(err) => {
                    tracing::warn!(error = %err, tag, "cache invalidation failed");
                    0
                }
            },
        };
        tracing::debug!(tag, removed, "cache tag revalidated");
    }

    /// Redis expires entries itself; only the memory backend needs purging.
    pub fn purge_expired(&self) -> usize {
        match self {
            Self::Memory(cache) => cache.purge_expired(),
            Self::Redis(_) => 0,
        }
    }

    pub async fn is_healthy(&self) -> bool {
        match self {
            Self::Memory(_) => true,
            Self::Redis(cache) => cache.is_connected().await,
        }
    }
}
