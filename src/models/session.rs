//! Session, participant and membership models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session lifecycle state, derived from `expires_at` at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Expired,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A time-boxed voting room identified by a short shareable code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: i64,
    /// Six characters from `[A-Z0-9]`, unique among active sessions
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is active strictly before its expiry instant.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> SessionStatus {
        if self.is_active_at(now) {
            SessionStatus::Active
        } else {
            SessionStatus::Expired
        }
    }
}

/// A named, anonymous identity. Display names are not unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub id: i64,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Result of creating a session: the host is already a member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedSession {
    pub session_id: i64,
    pub code: String,
    pub participant_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinedSession {
    pub session_id: i64,
    pub code: String,
    pub participant_id: i64,
}

/// Member count and display names in join order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionRoster {
    pub participant_count: i64,
    pub participants: Vec<String>,
}

impl SessionRoster {
    pub fn from_names(participants: Vec<String>) -> Self {
        Self {
            participant_count: participants.len() as i64,
            participants,
        }
    }
}

/// What a returning participant needs to resume voting in a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionContext {
    pub session_id: i64,
    pub code: String,
    pub participant_id: i64,
    pub participant_name: String,
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub roster: SessionRoster,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_expiring_at(expires_at: DateTime<Utc>) -> Session {
        Session {
            id: 1,
            code: "ABC123".to_string(),
            created_at: expires_at - Duration::hours(24),
            expires_at,
        }
    }

    #[test]
    fn test_status_boundary() {
        let expires_at = Utc::now();
        let session = session_expiring_at(expires_at);

        assert_eq!(
            session.status_at(expires_at - Duration::milliseconds(1)),
            SessionStatus::Active
        );
        // Expiry instant itself is already expired
        assert_eq!(session.status_at(expires_at), SessionStatus::Expired);
        assert_eq!(
            session.status_at(expires_at + Duration::seconds(1)),
            SessionStatus::Expired
        );
    }

    #[test]
    fn test_roster_from_names() {
        let roster = SessionRoster::from_names(vec!["Alice".into(), "Bob".into()]);
        assert_eq!(roster.participant_count, 2);
        assert_eq!(roster.participants, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Expired).unwrap();
        assert_eq!(json, "\"expired\"");
    }
}
