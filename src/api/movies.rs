//! Movie catalog API endpoints
//!
//! - GET /api/v1/movies - Whole catalog
//! - GET /api/v1/movies/{id} - One movie

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::Movie;

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub movies: Vec<Movie>,
    pub total: usize,
}

/// Build the movies router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movies))
        .route("/{id}", get(get_movie))
}

/// GET /api/v1/movies - List the catalog ordered by title
async fn list_movies(State(state): State<AppState>) -> Result<Json<MovieListResponse>, ApiError> {
    let movies = state.catalog_service.list_movies().await?;
    Ok(Json(MovieListResponse {
        total: movies.len(),
        movies,
    }))
}

/// GET /api/v1/movies/{id} - Get one movie
async fn get_movie(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Movie>, ApiError> {
    let Path(id) = path.map_err(|e| ApiError::validation_error(e.body_text()))?;
    let movie = state.catalog_service.get_movie(id).await?;
    Ok(Json(movie))
}
