//! Session query service
//!
//! Read paths clients poll while a session is running: the movies a
//! participant still has to vote on.

use crate::db::repositories::{SessionRepository, VoteRepository};
use crate::models::MovieWithStats;
use crate::services::error::{ServiceError, ServiceResult};
use chrono::Utc;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Session query service
pub struct SessionQueryService {
    session_repo: Arc<dyn SessionRepository>,
    vote_repo: Arc<dyn VoteRepository>,
}

impl SessionQueryService {
    /// Create a new session query service
    pub fn new(
        session_repo: Arc<dyn SessionRepository>,
        vote_repo: Arc<dyn VoteRepository>,
    ) -> Self {
        Self {
            session_repo,
            vote_repo,
        }
    }

    /// Movies the participant has not voted on yet, shuffled, each with the
    /// session's like and dislike counts.
    ///
    /// Each call shuffles independently so participants see different orders.
    pub async fn list_unvoted_movies(
        &self,
        session_id: i64,
        participant_id: i64,
    ) -> ServiceResult<Vec<MovieWithStats>> {
        if !self
            .session_repo
            .is_active_member(session_id, participant_id, Utc::now())
            .await?
        {
            return Err(ServiceError::Unauthorized(
                "Participant is not in this session".to_string(),
            ));
        }

        let mut movies = self.vote_repo.list_unvoted(session_id, participant_id).await?;
        movies.shuffle(&mut rand::thread_rng());
        Ok(movies)
    }
}
