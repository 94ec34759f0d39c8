//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository owns the SQL for one part of the schema.

pub mod movie;
pub mod session;
pub mod vote;

pub use movie::{MovieRepository, SqlxMovieRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use vote::{SqlxVoteRepository, VoteRepository};
