//! Catalog service
//!
//! Read-only access to the movie catalog, cached in memory. The catalog
//! changes only through an external import, so cached entries simply expire.

use crate::cache::{CacheLayer, MemoryCache};
use crate::db::repositories::MovieRepository;
use crate::models::Movie;
use crate::services::error::{ServiceError, ServiceResult};
use std::sync::Arc;

const ALL_MOVIES_KEY: &str = "movies:all";

fn movie_key(id: i64) -> String {
    format!("movie:{}", id)
}

/// Catalog service
pub struct CatalogService {
    movie_repo: Arc<dyn MovieRepository>,
    cache: Arc<MemoryCache>,
}

impl CatalogService {
    /// Create a new catalog service
    pub fn new(movie_repo: Arc<dyn MovieRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { movie_repo, cache }
    }

    /// Get one movie by ID
    pub async fn get_movie(&self, id: i64) -> ServiceResult<Movie> {
        let key = movie_key(id);
        match self.cache.get::<Movie>(&key).await {
            Ok(Some(movie)) => return Ok(movie),
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring unreadable cache entry {}: {}", key, e),
        }

        let movie = self
            .movie_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Movie {} not found", id)))?;

        if let Err(e) = self.cache.set(&key, &movie).await {
            tracing::warn!("Failed to cache {}: {}", key, e);
        }
        Ok(movie)
    }

    /// List the whole catalog ordered by title
    pub async fn list_movies(&self) -> ServiceResult<Vec<Movie>> {
        match self.cache.get::<Vec<Movie>>(ALL_MOVIES_KEY).await {
            Ok(Some(movies)) => return Ok(movies),
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring unreadable cache entry {}: {}", ALL_MOVIES_KEY, e),
        }

        let movies = self.movie_repo.list().await?;
        if let Err(e) = self.cache.set(ALL_MOVIES_KEY, &movies).await {
            tracing::warn!("Failed to cache {}: {}", ALL_MOVIES_KEY, e);
        }
        Ok(movies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxMovieRepository;
    use crate::services::test_support::{seeded_pool, SEEDED_MOVIE_COUNT};

    async fn setup_service() -> (crate::db::DynDatabasePool, CatalogService) {
        let pool = seeded_pool().await;
        let service = CatalogService::new(
            SqlxMovieRepository::boxed(pool.clone()),
            Arc::new(MemoryCache::new()),
        );
        (pool, service)
    }

    #[tokio::test]
    async fn test_get_movie() {
        let (_pool, service) = setup_service().await;

        let movie = service.get_movie(1).await.unwrap();
        assert_eq!(movie.title, "Zodiac");
        assert!(matches!(
            service.get_movie(404).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cached_reads_survive_source_changes() {
        let (pool, service) = setup_service().await;
        assert_eq!(service.get_movie(2).await.unwrap().title, "Alien");
        assert_eq!(service.list_movies().await.unwrap().len(), SEEDED_MOVIE_COUNT);

        sqlx::query("UPDATE movies SET title = 'Aliens' WHERE id = 2")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        // Served from cache until the TTL passes
        assert_eq!(service.get_movie(2).await.unwrap().title, "Alien");
        let titles: Vec<String> = service
            .list_movies()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert!(titles.contains(&"Alien".to_string()));
    }
}
