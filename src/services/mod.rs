//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - `SessionService` creates, joins and reads sessions
//! - `VoteService` records votes and reports matches they complete
//! - `MatchService` evaluates and lists matches
//! - `SessionQueryService` serves the polling reads
//! - `CatalogService` reads the movie catalog through the cache
//!
//! All of them report failures as [`ServiceError`].

pub mod catalog;
pub mod code;
pub mod error;
pub mod matching;
pub mod query;
pub mod rate_limiter;
pub mod session;
pub mod vote;

pub use catalog::CatalogService;
pub use code::generate_candidate_code;
pub use error::{ServiceError, ServiceResult};
pub use matching::{evaluate_match, MatchService, MIN_LIKES_FOR_MATCH};
pub use query::SessionQueryService;
pub use rate_limiter::JoinRateLimiter;
pub use session::SessionService;
pub use vote::{VoteReceipt, VoteService};
