//! Data models
//!
//! This module contains the data structures shared by the repositories,
//! services and HTTP handlers:
//! - Durable entities (Session, Participant, Movie, Vote)
//! - Derived views (SessionRoster, MovieWithStats, Match)
//! - Outcomes returned by the write paths (CreatedSession, VoteOutcome)

mod matches;
mod movie;
mod session;
mod vote;

pub use matches::{Match, MatchTally};
pub use movie::{Movie, MovieWithStats, VoteStats};
pub use session::{
    CreatedSession, JoinedSession, Participant, Session, SessionContext, SessionRoster,
    SessionStatus,
};
pub use vote::{CastVote, RecordedVote, Vote, VoteKind, VoteOutcome};
