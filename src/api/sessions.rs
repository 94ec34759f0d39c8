//! Session API endpoints
//!
//! Handles HTTP requests for voting sessions:
//! - POST /api/v1/sessions - Create a session and its host participant
//! - POST /api/v1/sessions/join - Join an active session by code
//! - GET /api/v1/sessions/enter - Resume a session as an existing participant
//! - GET /api/v1/sessions/{id} - Session status and roster
//! - GET /api/v1/sessions/{id}/movies - Movies the participant has not voted on
//! - POST /api/v1/sessions/{id}/votes - Cast a vote
//! - GET /api/v1/sessions/{id}/matches - Ranked matches

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        ConnectInfo, Path, Query, State,
    },
    http::{Extensions, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::api::middleware::{client_address, ApiError, AppState};
use crate::models::{
    CreatedSession, JoinedSession, Match, MovieWithStats, SessionContext, SessionStatus,
    VoteKind,
};
use crate::services::{ServiceError, VoteReceipt};

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinSessionRequest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EnterSessionQuery {
    pub code: String,
    pub participant_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantQuery {
    pub participant_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub participant_id: i64,
    pub movie_id: i64,
    /// "like" or "dislike"
    pub vote: String,
}

/// Session status with its roster
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: i64,
    pub code: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub participant_count: i64,
    pub participants: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UnvotedMoviesResponse {
    pub movies: Vec<MovieWithStats>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MatchListResponse {
    pub matches: Vec<Match>,
    pub total_matches: usize,
}

/// Build the sessions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/join", post(join_session))
        .route("/enter", get(enter_session))
        .route("/{id}", get(get_session))
        .route("/{id}/movies", get(list_unvoted_movies))
        .route("/{id}/votes", post(cast_vote))
        .route("/{id}/matches", get(list_matches))
}

fn session_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    let Path(id) = path.map_err(|e| ApiError::validation_error(e.body_text()))?;
    Ok(id)
}

/// POST /api/v1/sessions - Create a session
async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedSession>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::validation_error(e.body_text()))?;
    let created = state.session_service.create_session(&body.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/v1/sessions/join - Join a session by code
///
/// Failed lookups count against the caller's address; once over the limit,
/// joins are refused without touching the store.
async fn join_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    body: Result<Json<JoinSessionRequest>, JsonRejection>,
) -> Result<Json<JoinedSession>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::validation_error(e.body_text()))?;

    // Proxy headers first, then the socket peer; unidentified callers are not throttled
    let client = client_address(&headers).or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    });

    if let Some(client) = client.as_deref() {
        if state.join_limiter.is_limited(client).await {
            tracing::warn!("Join attempts from {} throttled", client);
            return Err(ApiError::too_many_requests(
                "Too many failed join attempts, try again later",
            ));
        }
    }

    let result = state.session_service.join_session(&body.code, &body.name).await;
    if let Some(client) = client.as_deref() {
        match &result {
            Ok(_) => state.join_limiter.clear(client).await,
            Err(ServiceError::InvalidSession) => state.join_limiter.record_failure(client).await,
            Err(_) => {}
        }
    }

    Ok(Json(result?))
}

/// GET /api/v1/sessions/enter?code=&participant_id= - Resume a session
async fn enter_session(
    State(state): State<AppState>,
    query: Result<Query<EnterSessionQuery>, QueryRejection>,
) -> Result<Json<SessionContext>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation_error(e.body_text()))?;
    let context = state
        .session_service
        .enter_session(&query.code, query.participant_id)
        .await?;
    Ok(Json(context))
}

/// GET /api/v1/sessions/{id} - Session status and roster
async fn get_session(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = session_id(path)?;
    let session = state.session_service.get_active_session(id).await?;
    let roster = state.session_service.get_roster(id).await?;

    Ok(Json(SessionResponse {
        session_id: session.id,
        status: session.status_at(Utc::now()),
        code: session.code,
        created_at: session.created_at,
        expires_at: session.expires_at,
        participant_count: roster.participant_count,
        participants: roster.participants,
    }))
}

/// GET /api/v1/sessions/{id}/movies?participant_id= - Movies left to vote on
async fn list_unvoted_movies(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<ParticipantQuery>, QueryRejection>,
) -> Result<Json<UnvotedMoviesResponse>, ApiError> {
    let id = session_id(path)?;
    let Query(query) = query.map_err(|e| ApiError::validation_error(e.body_text()))?;

    let movies = state
        .query_service
        .list_unvoted_movies(id, query.participant_id)
        .await?;

    Ok(Json(UnvotedMoviesResponse {
        total: movies.len(),
        movies,
    }))
}

/// POST /api/v1/sessions/{id}/votes - Cast a vote
async fn cast_vote(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CastVoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VoteReceipt>), ApiError> {
    let id = session_id(path)?;
    let Json(body) = body.map_err(|e| ApiError::validation_error(e.body_text()))?;
    let vote: VoteKind = body.vote.parse().map_err(ApiError::validation_error)?;

    let receipt = state
        .vote_service
        .register_vote(id, body.participant_id, body.movie_id, vote)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/v1/sessions/{id}/matches - Ranked matches
async fn list_matches(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MatchListResponse>, ApiError> {
    let id = session_id(path)?;
    let matches = state.match_service.list_matches(id).await?;

    Ok(Json(MatchListResponse {
        total_matches: matches.len(),
        matches,
    }))
}
