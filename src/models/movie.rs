//! Movie catalog model

use serde::{Deserialize, Serialize};

/// A catalog entry. The catalog is seeded externally and read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub poster_url: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
}

/// Per-session vote counts for one movie.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteStats {
    pub likes: i64,
    pub dislikes: i64,
}

/// Movie with the session's vote counts, as offered to a voter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieWithStats {
    #[serde(flatten)]
    pub movie: Movie,
    pub stats: VoteStats,
}

impl MovieWithStats {
    pub fn new(movie: Movie, stats: VoteStats) -> Self {
        Self { movie, stats }
    }
}
