//! API middleware
//!
//! Contains:
//! - Shared application state handed to every handler
//! - The JSON error envelope and its status mapping
//! - Request statistics for the health endpoint

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{SqlxMovieRepository, SqlxSessionRepository, SqlxVoteRepository};
use crate::db::DynDatabasePool;
use crate::services::{
    CatalogService, JoinRateLimiter, MatchService, ServiceError, SessionQueryService,
    SessionService, VoteService,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Total response time in microseconds (for calculating average)
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Get total request count
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Get average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub session_service: Arc<SessionService>,
    pub vote_service: Arc<VoteService>,
    pub match_service: Arc<MatchService>,
    pub query_service: Arc<SessionQueryService>,
    pub catalog_service: Arc<CatalogService>,
    pub join_limiter: Arc<JoinRateLimiter>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire repositories, services and the catalog cache onto one pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let vote_repo = SqlxVoteRepository::boxed(pool.clone());
        let movie_repo = SqlxMovieRepository::boxed(pool.clone());
        let cache = create_cache(&config.cache);

        Self {
            session_service: Arc::new(SessionService::new(session_repo.clone(), &config.session)),
            vote_service: Arc::new(VoteService::new(vote_repo.clone())),
            match_service: Arc::new(MatchService::new(session_repo.clone(), vote_repo.clone())),
            query_service: Arc::new(SessionQueryService::new(session_repo, vote_repo)),
            catalog_service: Arc::new(CatalogService::new(movie_repo, cache)),
            join_limiter: Arc::new(JoinRateLimiter::new(&config.rate_limit)),
            request_stats: Arc::new(RequestStats::new()),
            pool,
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn invalid_session() -> Self {
        Self::new("INVALID_SESSION", "Invalid or expired session")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new("TOO_MANY_REQUESTS", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::FORBIDDEN,
            "INVALID_SESSION" | "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "TOO_MANY_REQUESTS" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(msg) => ApiError::validation_error(msg),
            ServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ServiceError::InvalidSession => ApiError::invalid_session(),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Internal(e) => {
                // Storage details stay in the log
                tracing::error!("Internal error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Best-effort client address from proxy headers, used to key rate limits
pub fn client_address(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // Take the first IP in the list
            if let Some(ip) = forwarded_str.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.trim().to_string());
        }
    }

    None
}

/// Request statistics middleware
///
/// Records request count and response time for the health endpoint.
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let response = next.run(request).await;

    // Microseconds for precision
    let duration_us = start.elapsed().as_micros() as u64;
    state.request_stats.record(duration_us);

    response
}
