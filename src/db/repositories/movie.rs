//! Movie repository
//!
//! Read-only access to the movie catalog. Rows are loaded by an external
//! import; nothing in the voting core writes to `movies`.

use super::vote::{row_to_movie_mysql, row_to_movie_sqlite};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Movie;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, SqlitePool};
use std::sync::Arc;

/// Movie repository trait
#[async_trait]
pub trait MovieRepository: Send + Sync {
    /// Get movie by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Movie>>;

    /// List the whole catalog ordered by title
    async fn list(&self) -> Result<Vec<Movie>>;
}

/// SQLx-based movie repository implementation
pub struct SqlxMovieRepository {
    pool: DynDatabasePool,
}

impl SqlxMovieRepository {
    /// Create a new SQLx movie repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MovieRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MovieRepository for SqlxMovieRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Movie>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_movie_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_movie_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Movie>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_movies_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_movies_mysql(self.pool.mysql()?).await,
        }
    }
}

const SELECT_ALL_MOVIES: &str =
    "SELECT id, title, poster_url, year, genre FROM movies ORDER BY title ASC, id ASC";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_movie_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Movie>> {
    let row = sqlx::query("SELECT id, title, poster_url, year, genre FROM movies WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get movie by ID")?;

    Ok(row.map(|r| row_to_movie_sqlite(&r)))
}

async fn list_movies_sqlite(pool: &SqlitePool) -> Result<Vec<Movie>> {
    let rows = sqlx::query(SELECT_ALL_MOVIES)
        .fetch_all(pool)
        .await
        .context("Failed to list movies")?;

    Ok(rows.iter().map(row_to_movie_sqlite).collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_movie_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Movie>> {
    let row = sqlx::query("SELECT id, title, poster_url, year, genre FROM movies WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get movie by ID")?;

    Ok(row.map(|r| row_to_movie_mysql(&r)))
}

async fn list_movies_mysql(pool: &MySqlPool) -> Result<Vec<Movie>> {
    let rows = sqlx::query(SELECT_ALL_MOVIES)
        .fetch_all(pool)
        .await
        .context("Failed to list movies")?;

    Ok(rows.iter().map(row_to_movie_mysql).collect())
}
