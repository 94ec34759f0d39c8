//! Match model

use serde::{Deserialize, Serialize};

use super::Movie;

/// Raw like counts for one movie in one session, the input to match evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchTally {
    pub movie: Movie,
    /// Members of the session, voters or not
    pub total_participants: i64,
    /// Display name of every participant who liked the movie, one per like
    pub likers: Vec<String>,
}

impl MatchTally {
    pub fn like_count(&self) -> i64 {
        self.likers.len() as i64
    }
}

/// A movie that reached the like threshold in a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    pub movie_id: i64,
    pub title: String,
    pub poster_url: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub like_count: i64,
    /// Sorted ascending, duplicates removed
    pub users_who_liked: Vec<String>,
}
