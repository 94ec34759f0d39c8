//! Vote model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MatchTally;

/// Kind of vote a participant casts on a movie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl std::fmt::Display for VoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Like => write!(f, "like"),
            Self::Dislike => write!(f, "dislike"),
        }
    }
}

impl std::str::FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            _ => Err(format!("Invalid vote: {}", s)),
        }
    }
}

/// Immutable vote record. At most one per (session, participant, movie).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub id: i64,
    pub session_id: i64,
    pub participant_id: i64,
    pub movie_id: i64,
    pub vote: VoteKind,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastVote {
    pub session_id: i64,
    pub participant_id: i64,
    pub movie_id: i64,
    pub vote: VoteKind,
}

/// A stored vote plus, for likes, the movie's tally read in the same transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedVote {
    pub vote: Vote,
    pub tally: Option<MatchTally>,
}

/// Result of an atomic attempt to record a vote
#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    Recorded(RecordedVote),
    /// Participant is not a member of an active session with that id
    NotMember,
    UnknownMovie,
    AlreadyVoted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_kind_parse() {
        assert_eq!("like".parse::<VoteKind>(), Ok(VoteKind::Like));
        assert_eq!("DISLIKE".parse::<VoteKind>(), Ok(VoteKind::Dislike));
        assert_eq!(" like ".parse::<VoteKind>(), Ok(VoteKind::Like));
        assert!("love".parse::<VoteKind>().is_err());
        assert!("".parse::<VoteKind>().is_err());
    }

    #[test]
    fn test_vote_kind_display_matches_storage() {
        assert_eq!(VoteKind::Like.to_string(), "like");
        assert_eq!(VoteKind::Dislike.to_string(), "dislike");
    }

    #[test]
    fn test_vote_kind_serde() {
        let kind: VoteKind = serde_json::from_str("\"dislike\"").unwrap();
        assert_eq!(kind, VoteKind::Dislike);
        assert!(serde_json::from_str::<VoteKind>("\"meh\"").is_err());
    }
}
