//! Session service
//!
//! Implements the session registry:
//! - Creating a session with its host participant
//! - Joining an active session by code
//! - Reading the roster of an active session
//! - Re-entering a session as an existing participant
//!
//! Expired and unknown sessions are reported the same way.

use crate::config::SessionConfig;
use crate::db::repositories::SessionRepository;
use crate::models::{CreatedSession, JoinedSession, Session, SessionContext, SessionRoster};
use crate::services::code::{generate_candidate_code, is_well_formed, normalize_code};
use crate::services::error::{ServiceError, ServiceResult};
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static MARKUP_TAG: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"<[^>]*>"));

/// Clean a display name: strip markup, trim, and enforce the length limit.
pub fn normalize_display_name(raw: &str, max_len: usize) -> ServiceResult<String> {
    let tag = MARKUP_TAG
        .as_ref()
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Regex error: {}", e)))?;
    let stripped = tag.replace_all(raw, "");
    let name = stripped.trim();

    if name.is_empty() {
        return Err(ServiceError::InvalidInput("Name cannot be empty".to_string()));
    }
    if name.chars().count() > max_len {
        return Err(ServiceError::InvalidInput(format!(
            "Name must be at most {} characters",
            max_len
        )));
    }

    Ok(name.to_string())
}

/// Session service for creating, joining and reading sessions
pub struct SessionService {
    session_repo: Arc<dyn SessionRepository>,
    ttl: Duration,
    max_code_attempts: u32,
    max_name_length: usize,
}

impl SessionService {
    /// Create a new session service
    pub fn new(session_repo: Arc<dyn SessionRepository>, config: &SessionConfig) -> Self {
        Self {
            session_repo,
            ttl: Duration::hours(config.ttl_hours),
            max_code_attempts: config.max_code_attempts,
            max_name_length: config.max_name_length,
        }
    }

    /// Create a session hosted by a new participant called `name`.
    ///
    /// The participant, session and membership become visible together or
    /// not at all.
    pub async fn create_session(&self, name: &str) -> ServiceResult<CreatedSession> {
        let name = normalize_display_name(name, self.max_name_length)?;
        let now = Utc::now();
        let mut next_code = || generate_candidate_code(&mut rand::thread_rng());

        let created = self
            .session_repo
            .create_with_host(&name, &mut next_code, self.max_code_attempts, now, now + self.ttl)
            .await?
            .ok_or_else(|| {
                ServiceError::Internal(anyhow::anyhow!(
                    "No free session code after {} attempts",
                    self.max_code_attempts
                ))
            })?;

        tracing::info!(
            "Session {} created with code {} by participant {}",
            created.session_id,
            created.code,
            created.participant_id
        );
        Ok(created)
    }

    /// Join the active session using `code` as a new participant.
    pub async fn join_session(&self, code: &str, name: &str) -> ServiceResult<JoinedSession> {
        let name = normalize_display_name(name, self.max_name_length)?;
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(ServiceError::InvalidInput("Session code is required".to_string()));
        }
        if !is_well_formed(&code) {
            return Err(ServiceError::InvalidSession);
        }

        let joined = self
            .session_repo
            .join_by_code(&code, &name, Utc::now())
            .await?
            .ok_or(ServiceError::InvalidSession)?;

        tracing::info!(
            "Participant {} joined session {}",
            joined.participant_id,
            joined.session_id
        );
        Ok(joined)
    }

    /// Get a session that has not expired.
    pub async fn get_active_session(&self, session_id: i64) -> ServiceResult<Session> {
        match self.session_repo.get_by_id(session_id).await? {
            Some(session) if session.is_active_at(Utc::now()) => Ok(session),
            _ => Err(ServiceError::InvalidSession),
        }
    }

    /// Member count and names, in join order, of an active session.
    pub async fn get_roster(&self, session_id: i64) -> ServiceResult<SessionRoster> {
        self.get_active_session(session_id).await?;
        let names = self.session_repo.list_participant_names(session_id).await?;
        Ok(SessionRoster::from_names(names))
    }

    /// Resume a session as an existing participant.
    ///
    /// Fails with `Unauthorized` unless the participant belongs to the
    /// active session using `code`.
    pub async fn enter_session(
        &self,
        code: &str,
        participant_id: i64,
    ) -> ServiceResult<SessionContext> {
        let code = normalize_code(code);
        let now = Utc::now();
        let denied = || ServiceError::Unauthorized("Not a participant of this session".to_string());

        let session = self
            .session_repo
            .get_active_by_code(&code, now)
            .await?
            .ok_or_else(denied)?;
        if !self
            .session_repo
            .is_active_member(session.id, participant_id, now)
            .await?
        {
            return Err(denied());
        }
        let participant = self
            .session_repo
            .get_participant(participant_id)
            .await?
            .ok_or_else(denied)?;

        let names = self.session_repo.list_participant_names(session.id).await?;

        Ok(SessionContext {
            session_id: session.id,
            code: session.code,
            participant_id,
            participant_name: participant.display_name,
            expires_at: session.expires_at,
            roster: SessionRoster::from_names(names),
        })
    }
}
