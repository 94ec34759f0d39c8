//! Cache layer
//!
//! In-process cache (moka) for the movie catalog. The catalog is reference
//! data loaded outside this service, so entries only need a time-to-live;
//! session and vote state is never cached.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cinematch::cache::{create_cache, CacheLayer};
//! use cinematch::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set("movie:1", &movie).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// The generic methods keep this trait from being object safe; share the
/// concrete `MemoryCache` behind an `Arc` instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache; it expires after the cache's TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()>;
}

/// Create the catalog cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<MemoryCache> {
    let ttl = Duration::from_secs(config.ttl_seconds);
    Arc::new(MemoryCache::with_capacity_and_ttl(config.max_capacity, ttl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cache_from_config() {
        let config = CacheConfig {
            ttl_seconds: 60,
            max_capacity: 100,
        };
        let cache = create_cache(&config);

        cache.set("movie:1", &"Heat".to_string()).await.unwrap();
        let value: Option<String> = cache.get("movie:1").await.unwrap();
        assert_eq!(value.as_deref(), Some("Heat"));
    }
}
