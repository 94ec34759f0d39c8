//! Error taxonomy shared by the session, vote and match services

/// Error types for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing input
    #[error("Validation error: {0}")]
    InvalidInput(String),

    /// Caller is not a member of an active session with that id
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session code or id does not resolve to an active session
    #[error("Invalid or expired session")]
    InvalidSession,

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Participant already voted on this movie in this session
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failure or exhausted retries
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
