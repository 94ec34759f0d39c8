//! In-memory cache implementation using moka
//!
//! Values are stored as JSON so one cache can hold any serializable type.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default maximum cache capacity (number of entries)
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Default TTL for cache entries (1 hour)
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// JSON-serialized cache value
#[derive(Clone)]
struct CacheEntry {
    data: Arc<String>,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// In-memory cache using moka
pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    /// Create a new memory cache with default settings
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    /// Create a new memory cache with custom capacity and TTL
    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(default_ttl)
            .build();

        Self { cache, default_ttl }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry::new(value)?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Movie;

    fn movie() -> Movie {
        Movie {
            id: 1,
            title: "Heat".to_string(),
            poster_url: None,
            year: Some(1995),
            genre: Some("Crime".to_string()),
        }
    }

    #[tokio::test]
    async fn test_set_and_get_struct() {
        let cache = MemoryCache::new();
        cache.set("movie:1", &movie()).await.unwrap();

        let cached: Option<Movie> = cache.get("movie:1").await.unwrap();
        assert_eq!(cached, Some(movie()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = MemoryCache::new();
        let cached: Option<Movie> = cache.get("movie:404").await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_type_mismatch_is_error() {
        let cache = MemoryCache::new();
        cache.set("movie:1", &"not a movie").await.unwrap();
        assert!(cache.get::<Movie>("movie:1").await.is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(20))]

            /// Entries disappear once the TTL has passed
            #[test]
            fn property_cache_ttl_expiration(
                key in "[a-z]{1,10}",
                value in "[a-z]{1,100}"
            ) {
                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async {
                    let cache = MemoryCache::with_capacity_and_ttl(1000, Duration::from_millis(10));

                    cache.set(&key, &value).await.unwrap();
                    let result: Option<String> = cache.get(&key).await.unwrap();
                    prop_assert_eq!(result, Some(value.clone()));

                    tokio::time::sleep(Duration::from_millis(50)).await;
                    cache.cache.run_pending_tasks().await;

                    let expired: Option<String> = cache.get(&key).await.unwrap();
                    prop_assert_eq!(expired, None);
                    Ok(())
                })?;
            }
        }
    }
}
