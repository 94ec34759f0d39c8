//! Match detection
//!
//! A movie is a match in a session once it has at least
//! [`MIN_LIKES_FOR_MATCH`] likes, provided the session has at least
//! [`MIN_PARTICIPANTS_FOR_MATCH`] members. Evaluation is a pure function of
//! the like tally, so it gives the same answer whatever order the votes
//! arrived in and can be repeated freely.

use crate::db::repositories::{SessionRepository, VoteRepository};
use crate::models::{Match, MatchTally};
use crate::services::error::{ServiceError, ServiceResult};
use chrono::Utc;
use std::cmp::Ordering;
use std::sync::Arc;

/// Likes a movie needs to become a match. Independent of session size.
pub const MIN_LIKES_FOR_MATCH: i64 = 2;

/// Sessions smaller than this never produce matches.
pub const MIN_PARTICIPANTS_FOR_MATCH: i64 = 2;

/// Apply the match threshold to a tally.
pub fn evaluate_match(tally: &MatchTally) -> Option<Match> {
    if tally.total_participants < MIN_PARTICIPANTS_FOR_MATCH {
        return None;
    }
    let like_count = tally.like_count();
    if like_count < MIN_LIKES_FOR_MATCH {
        return None;
    }

    let mut users_who_liked = tally.likers.clone();
    users_who_liked.sort();
    users_who_liked.dedup();

    Some(Match {
        movie_id: tally.movie.id,
        title: tally.movie.title.clone(),
        poster_url: tally.movie.poster_url.clone(),
        year: tally.movie.year,
        genre: tally.movie.genre.clone(),
        like_count,
        users_who_liked,
    })
}

/// Order matches by like count descending, then title, then movie ID.
pub fn rank_matches(matches: &mut [Match]) {
    matches.sort_by(|a, b| match b.like_count.cmp(&a.like_count) {
        Ordering::Equal => a.title.cmp(&b.title).then(a.movie_id.cmp(&b.movie_id)),
        other => other,
    });
}

/// Match service reading tallies from the vote ledger
pub struct MatchService {
    session_repo: Arc<dyn SessionRepository>,
    vote_repo: Arc<dyn VoteRepository>,
}

impl MatchService {
    /// Create a new match service
    pub fn new(
        session_repo: Arc<dyn SessionRepository>,
        vote_repo: Arc<dyn VoteRepository>,
    ) -> Self {
        Self {
            session_repo,
            vote_repo,
        }
    }

    async fn ensure_active(&self, session_id: i64) -> ServiceResult<()> {
        match self.session_repo.get_by_id(session_id).await? {
            Some(session) if session.is_active_at(Utc::now()) => Ok(()),
            _ => Err(ServiceError::InvalidSession),
        }
    }

    /// Evaluate one movie against the threshold as of now.
    pub async fn evaluate(&self, session_id: i64, movie_id: i64) -> ServiceResult<Option<Match>> {
        self.ensure_active(session_id).await?;
        let tally = self
            .vote_repo
            .tally(session_id, movie_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Movie {} not found", movie_id)))?;
        Ok(evaluate_match(&tally))
    }

    /// Every match in an active session, ranked.
    pub async fn list_matches(&self, session_id: i64) -> ServiceResult<Vec<Match>> {
        self.ensure_active(session_id).await?;
        let tallies = self.vote_repo.session_tallies(session_id).await?;

        let mut matches: Vec<Match> = tallies.iter().filter_map(evaluate_match).collect();
        rank_matches(&mut matches);

        tracing::debug!("Session {} has {} matches", session_id, matches.len());
        Ok(matches)
    }
}
