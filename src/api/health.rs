//! Health endpoint
//!
//! GET /api/v1/health - store reachability and request statistics

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::middleware::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    /// Average response time in milliseconds
    pub avg_response_time_ms: f64,
}

/// GET /api/v1/health
///
/// Always answers 200; a failed ping shows up as `degraded`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.pool.ping().await {
        Ok(()) => ("ok", "connected"),
        Err(e) => {
            tracing::warn!("Health check ping failed: {}", e);
            ("degraded", "unavailable")
        }
    };

    let stats = &state.request_stats;
    Json(HealthResponse {
        status,
        database,
        uptime_seconds: stats.uptime_seconds(),
        total_requests: stats.total_requests(),
        avg_response_time_ms: stats.avg_response_time_us() / 1000.0,
    })
}
