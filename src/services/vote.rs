//! Vote service
//!
//! Records votes in the ledger. A like is evaluated for a match inside the
//! same transaction that stored it, so the voter learns synchronously when
//! their vote pushed a movie over the threshold.

use crate::db::repositories::VoteRepository;
use crate::models::{CastVote, Match, Vote, VoteKind, VoteOutcome};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::matching::evaluate_match;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// A stored vote and the match it completed, if any
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoteReceipt {
    pub vote: Vote,
    #[serde(rename = "match")]
    pub matched: Option<Match>,
}

/// Vote service for the per-session ledger
pub struct VoteService {
    vote_repo: Arc<dyn VoteRepository>,
}

impl VoteService {
    /// Create a new vote service
    pub fn new(vote_repo: Arc<dyn VoteRepository>) -> Self {
        Self { vote_repo }
    }

    /// Register one participant's vote on one movie.
    ///
    /// Checked in order: membership of an active session (`Unauthorized`),
    /// movie existence (`NotFound`), no earlier vote (`Conflict`).
    pub async fn register_vote(
        &self,
        session_id: i64,
        participant_id: i64,
        movie_id: i64,
        vote: VoteKind,
    ) -> ServiceResult<VoteReceipt> {
        if session_id <= 0 || participant_id <= 0 || movie_id <= 0 {
            return Err(ServiceError::InvalidInput(
                "session_id, participant_id and movie_id must be positive".to_string(),
            ));
        }

        let cast = CastVote {
            session_id,
            participant_id,
            movie_id,
            vote,
        };

        match self.vote_repo.record(&cast, Utc::now()).await? {
            VoteOutcome::Recorded(recorded) => {
                let matched = recorded.tally.as_ref().and_then(evaluate_match);
                if let Some(m) = &matched {
                    tracing::info!(
                        "Movie {} matched in session {} with {} likes",
                        m.movie_id,
                        session_id,
                        m.like_count
                    );
                }
                Ok(VoteReceipt {
                    vote: recorded.vote,
                    matched,
                })
            }
            VoteOutcome::NotMember => Err(ServiceError::Unauthorized(
                "Participant is not in this session".to_string(),
            )),
            VoteOutcome::UnknownMovie => {
                Err(ServiceError::NotFound(format!("Movie {} not found", movie_id)))
            }
            VoteOutcome::AlreadyVoted => {
                tracing::debug!(
                    "Duplicate vote by participant {} on movie {} in session {}",
                    participant_id,
                    movie_id,
                    session_id
                );
                Err(ServiceError::Conflict("Already voted on this movie".to_string()))
            }
        }
    }
}
