//! Session repository
//!
//! Database operations for sessions, participants and memberships.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL
//!
//! Every transaction here starts with a write. On SQLite that takes the
//! write lock up front, so concurrent creators and joiners queue on the busy
//! timeout instead of failing on a stale read snapshot.

use crate::config::DatabaseDriver;
use crate::db::{is_retryable_mysql_error, DynDatabasePool, MYSQL_TRANSACTION_ROUNDS};
use crate::models::{CreatedSession, JoinedSession, Participant, Session};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create the host participant, a session whose code is free among
    /// active sessions, and the host membership in one transaction.
    ///
    /// `next_code` is asked for a fresh candidate on every attempt. Returns
    /// `None`, with nothing persisted, when `max_attempts` candidates all
    /// collided with active sessions.
    async fn create_with_host(
        &self,
        host_name: &str,
        next_code: &mut (dyn FnMut() -> String + Send),
        max_attempts: u32,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<CreatedSession>>;

    /// Create a participant and add it to the active session with `code`.
    ///
    /// Returns `None`, with nothing persisted, when no active session uses
    /// the code.
    async fn join_by_code(
        &self,
        code: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<JoinedSession>>;

    /// Get session by ID regardless of expiry
    async fn get_by_id(&self, id: i64) -> Result<Option<Session>>;

    /// Get the active session using `code`, if any
    async fn get_active_by_code(&self, code: &str, now: DateTime<Utc>)
        -> Result<Option<Session>>;

    /// Whether the participant belongs to the session and the session is active
    async fn is_active_member(
        &self,
        session_id: i64,
        participant_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Get participant by ID
    async fn get_participant(&self, id: i64) -> Result<Option<Participant>>;

    /// Display names of the session's members, in join order
    async fn list_participant_names(&self, session_id: i64) -> Result<Vec<String>>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create_with_host(
        &self,
        host_name: &str,
        next_code: &mut (dyn FnMut() -> String + Send),
        max_attempts: u32,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<CreatedSession>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_with_host_sqlite(
                    self.pool.sqlite()?,
                    host_name,
                    next_code,
                    max_attempts,
                    now,
                    expires_at,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                // Concurrent guarded inserts can deadlock on the code index gap
                let pool = self.pool.mysql()?;
                let mut round = 1;
                loop {
                    let result = create_with_host_mysql(
                        pool,
                        host_name,
                        &mut *next_code,
                        max_attempts,
                        now,
                        expires_at,
                    )
                    .await;
                    match result {
                        Err(e) if round < MYSQL_TRANSACTION_ROUNDS && is_retryable_mysql_error(&e) => {
                            tracing::debug!("Retrying session creation (round {}): {:#}", round, e);
                            round += 1;
                        }
                        other => return other,
                    }
                }
            }
        }
    }

    async fn join_by_code(
        &self,
        code: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<JoinedSession>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => join_by_code_sqlite(self.pool.sqlite()?, code, name, now).await,
            DatabaseDriver::Mysql => join_by_code_mysql(self.pool.mysql()?, code, name, now).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_session_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_active_by_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_active_session_by_code_sqlite(self.pool.sqlite()?, code, now).await
            }
            DatabaseDriver::Mysql => {
                get_active_session_by_code_mysql(self.pool.mysql()?, code, now).await
            }
        }
    }

    async fn is_active_member(
        &self,
        session_id: i64,
        participant_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                is_active_member_sqlite(self.pool.sqlite()?, session_id, participant_id, now).await
            }
            DatabaseDriver::Mysql => {
                is_active_member_mysql(self.pool.mysql()?, session_id, participant_id, now).await
            }
        }
    }

    async fn get_participant(&self, id: i64) -> Result<Option<Participant>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_participant_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_participant_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list_participant_names(&self, session_id: i64) -> Result<Vec<String>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_participant_names_sqlite(self.pool.sqlite()?, session_id).await
            }
            DatabaseDriver::Mysql => {
                list_participant_names_mysql(self.pool.mysql()?, session_id).await
            }
        }
    }
}

const SELECT_ACTIVE_BY_CODE: &str = r#"
    SELECT id, code, created_at, expires_at
    FROM sessions
    WHERE code = ? AND expires_at > ?
    ORDER BY id DESC
    LIMIT 1
"#;

const SELECT_IS_ACTIVE_MEMBER: &str = r#"
    SELECT COUNT(*)
    FROM session_participants sp
    JOIN sessions s ON s.id = sp.session_id
    WHERE sp.session_id = ? AND sp.participant_id = ? AND s.expires_at > ?
"#;

const SELECT_PARTICIPANT_NAMES: &str = r#"
    SELECT p.display_name
    FROM session_participants sp
    JOIN participants p ON p.id = sp.participant_id
    WHERE sp.session_id = ?
    ORDER BY sp.joined_at ASC, sp.id ASC
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_with_host_sqlite(
    pool: &SqlitePool,
    host_name: &str,
    next_code: &mut (dyn FnMut() -> String + Send),
    max_attempts: u32,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<Option<CreatedSession>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let participant_id = sqlx::query("INSERT INTO participants (display_name, created_at) VALUES (?, ?)")
        .bind(host_name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create participant")?
        .last_insert_rowid();

    let mut created = None;
    for attempt in 1..=max_attempts {
        let code = next_code();
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (code, created_at, expires_at)
            SELECT ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM sessions WHERE code = ? AND expires_at > ?
            )
            "#,
        )
        .bind(&code)
        .bind(now)
        .bind(expires_at)
        .bind(&code)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create session")?;

        if result.rows_affected() == 1 {
            created = Some((result.last_insert_rowid(), code));
            break;
        }
        tracing::debug!("Session code {} already active (attempt {})", code, attempt);
    }

    let Some((session_id, code)) = created else {
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(None);
    };

    sqlx::query(
        "INSERT INTO session_participants (session_id, participant_id, joined_at) VALUES (?, ?, ?)",
    )
    .bind(session_id)
    .bind(participant_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to add host to session")?;

    tx.commit().await.context("Failed to commit session creation")?;

    Ok(Some(CreatedSession {
        session_id,
        code,
        participant_id,
    }))
}

async fn join_by_code_sqlite(
    pool: &SqlitePool,
    code: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Option<JoinedSession>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let participant_id = sqlx::query("INSERT INTO participants (display_name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create participant")?
        .last_insert_rowid();

    let session_id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM sessions WHERE code = ? AND expires_at > ? ORDER BY id DESC LIMIT 1",
    )
    .bind(code)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await
    .context("Failed to look up session by code")?;

    let Some(session_id) = session_id else {
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(None);
    };

    sqlx::query(
        "INSERT INTO session_participants (session_id, participant_id, joined_at) VALUES (?, ?, ?)",
    )
    .bind(session_id)
    .bind(participant_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to add participant to session")?;

    tx.commit().await.context("Failed to commit session join")?;

    Ok(Some(JoinedSession {
        session_id,
        code: code.to_string(),
        participant_id,
    }))
}

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, code, created_at, expires_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    row.map(|r| row_to_session_sqlite(&r)).transpose()
}

async fn get_active_session_by_code_sqlite(
    pool: &SqlitePool,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>> {
    let row = sqlx::query(SELECT_ACTIVE_BY_CODE)
        .bind(code)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by code")?;

    row.map(|r| row_to_session_sqlite(&r)).transpose()
}

async fn is_active_member_sqlite(
    pool: &SqlitePool,
    session_id: i64,
    participant_id: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(SELECT_IS_ACTIVE_MEMBER)
        .bind(session_id)
        .bind(participant_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("Failed to check session membership")?;

    Ok(count > 0)
}

async fn get_participant_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Participant>> {
    let row = sqlx::query("SELECT id, display_name, created_at FROM participants WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get participant by ID")?;

    match row {
        Some(row) => Ok(Some(Participant {
            id: row.get("id"),
            display_name: row.get("display_name"),
            created_at: row.get("created_at"),
        })),
        None => Ok(None),
    }
}

async fn list_participant_names_sqlite(pool: &SqlitePool, session_id: i64) -> Result<Vec<String>> {
    sqlx::query_scalar(SELECT_PARTICIPANT_NAMES)
        .bind(session_id)
        .fetch_all(pool)
        .await
        .context("Failed to list session participants")
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    Ok(Session {
        id: row.get("id"),
        code: row.get("code"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_with_host_mysql(
    pool: &MySqlPool,
    host_name: &str,
    next_code: &mut (dyn FnMut() -> String + Send),
    max_attempts: u32,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<Option<CreatedSession>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let participant_id = sqlx::query("INSERT INTO participants (display_name, created_at) VALUES (?, ?)")
        .bind(host_name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create participant")?
        .last_insert_id() as i64;

    let mut created = None;
    for attempt in 1..=max_attempts {
        let code = next_code();
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (code, created_at, expires_at)
            SELECT ?, ?, ? FROM DUAL
            WHERE NOT EXISTS (
                SELECT 1 FROM sessions WHERE code = ? AND expires_at > ?
            )
            "#,
        )
        .bind(&code)
        .bind(now)
        .bind(expires_at)
        .bind(&code)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create session")?;

        if result.rows_affected() == 1 {
            created = Some((result.last_insert_id() as i64, code));
            break;
        }
        tracing::debug!("Session code {} already active (attempt {})", code, attempt);
    }

    let Some((session_id, code)) = created else {
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(None);
    };

    sqlx::query(
        "INSERT INTO session_participants (session_id, participant_id, joined_at) VALUES (?, ?, ?)",
    )
    .bind(session_id)
    .bind(participant_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to add host to session")?;

    tx.commit().await.context("Failed to commit session creation")?;

    Ok(Some(CreatedSession {
        session_id,
        code,
        participant_id,
    }))
}

async fn join_by_code_mysql(
    pool: &MySqlPool,
    code: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Option<JoinedSession>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let participant_id = sqlx::query("INSERT INTO participants (display_name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create participant")?
        .last_insert_id() as i64;

    let session_id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM sessions WHERE code = ? AND expires_at > ? ORDER BY id DESC LIMIT 1",
    )
    .bind(code)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await
    .context("Failed to look up session by code")?;

    let Some(session_id) = session_id else {
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(None);
    };

    sqlx::query(
        "INSERT INTO session_participants (session_id, participant_id, joined_at) VALUES (?, ?, ?)",
    )
    .bind(session_id)
    .bind(participant_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to add participant to session")?;

    tx.commit().await.context("Failed to commit session join")?;

    Ok(Some(JoinedSession {
        session_id,
        code: code.to_string(),
        participant_id,
    }))
}

async fn get_session_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, code, created_at, expires_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    row.map(|r| row_to_session_mysql(&r)).transpose()
}

async fn get_active_session_by_code_mysql(
    pool: &MySqlPool,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>> {
    let row = sqlx::query(SELECT_ACTIVE_BY_CODE)
        .bind(code)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by code")?;

    row.map(|r| row_to_session_mysql(&r)).transpose()
}

async fn is_active_member_mysql(
    pool: &MySqlPool,
    session_id: i64,
    participant_id: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(SELECT_IS_ACTIVE_MEMBER)
        .bind(session_id)
        .bind(participant_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("Failed to check session membership")?;

    Ok(count > 0)
}

async fn get_participant_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Participant>> {
    let row = sqlx::query("SELECT id, display_name, created_at FROM participants WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get participant by ID")?;

    match row {
        Some(row) => Ok(Some(Participant {
            id: row.get("id"),
            display_name: row.get("display_name"),
            created_at: row.get("created_at"),
        })),
        None => Ok(None),
    }
}

async fn list_participant_names_mysql(pool: &MySqlPool, session_id: i64) -> Result<Vec<String>> {
    sqlx::query_scalar(SELECT_PARTICIPANT_NAMES)
        .bind(session_id)
        .fetch_all(pool)
        .await
        .context("Failed to list session participants")
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Session> {
    Ok(Session {
        id: row.get("id"),
        code: row.get("code"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxSessionRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxSessionRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create(repo: &SqlxSessionRepository, name: &str, code: &str) -> CreatedSession {
        let now = Utc::now();
        let code = code.to_string();
        let mut next_code = move || code.clone();
        repo.create_with_host(name, &mut next_code, 3, now, now + Duration::hours(24))
            .await
            .expect("Failed to create session")
            .expect("Code should be free")
    }

    async fn expire_session(pool: &DynDatabasePool, session_id: i64) {
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
            .bind(Utc::now() - Duration::seconds(1))
            .bind(session_id)
            .execute(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to expire session");
    }

    async fn count_rows(pool: &DynDatabasePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to count rows")
    }

    #[tokio::test]
    async fn test_create_with_host() {
        let (pool, repo) = setup_test_repo().await;

        let created = create(&repo, "Alice", "ABC123").await;
        assert_eq!(created.code, "ABC123");

        let session = repo.get_by_id(created.session_id).await.unwrap().unwrap();
        assert_eq!(session.code, "ABC123");
        assert!(session.is_active_at(Utc::now()));

        let names = repo.list_participant_names(created.session_id).await.unwrap();
        assert_eq!(names, vec!["Alice"]);
        assert!(repo
            .is_active_member(created.session_id, created.participant_id, Utc::now())
            .await
            .unwrap());
        assert_eq!(count_rows(&pool, "session_participants").await, 1);
    }

    #[tokio::test]
    async fn test_create_retries_on_active_collision() {
        let (_pool, repo) = setup_test_repo().await;
        create(&repo, "Alice", "AAAAAA").await;

        let mut candidates = vec!["BBBBBB".to_string(), "AAAAAA".to_string()];
        let mut next_code = move || candidates.pop().unwrap_or_default();
        let now = Utc::now();
        let created = repo
            .create_with_host("Bob", &mut next_code, 5, now, now + Duration::hours(24))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(created.code, "BBBBBB");
    }

    #[tokio::test]
    async fn test_create_exhausted_attempts_persists_nothing() {
        let (pool, repo) = setup_test_repo().await;
        create(&repo, "Alice", "AAAAAA").await;

        let mut next_code = || "AAAAAA".to_string();
        let now = Utc::now();
        let created = repo
            .create_with_host("Bob", &mut next_code, 4, now, now + Duration::hours(24))
            .await
            .unwrap();

        assert!(created.is_none());
        assert_eq!(count_rows(&pool, "participants").await, 1);
        assert_eq!(count_rows(&pool, "sessions").await, 1);
    }

    #[tokio::test]
    async fn test_expired_code_can_be_reused() {
        let (pool, repo) = setup_test_repo().await;
        let first = create(&repo, "Alice", "REUSE1").await;
        expire_session(&pool, first.session_id).await;

        let second = create(&repo, "Bob", "REUSE1").await;
        assert_ne!(first.session_id, second.session_id);

        let active = repo
            .get_active_by_code("REUSE1", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.id, second.session_id);
    }

    #[tokio::test]
    async fn test_join_by_code() {
        let (_pool, repo) = setup_test_repo().await;
        let created = create(&repo, "Alice", "JOIN01").await;

        let joined = repo
            .join_by_code("JOIN01", "Bob", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(joined.session_id, created.session_id);
        assert_ne!(joined.participant_id, created.participant_id);

        let names = repo.list_participant_names(created.session_id).await.unwrap();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_join_unknown_or_expired_persists_nothing() {
        let (pool, repo) = setup_test_repo().await;
        let created = create(&repo, "Alice", "GONE01").await;
        expire_session(&pool, created.session_id).await;

        assert!(repo.join_by_code("NOPE00", "Bob", Utc::now()).await.unwrap().is_none());
        assert!(repo.join_by_code("GONE01", "Bob", Utc::now()).await.unwrap().is_none());
        assert_eq!(count_rows(&pool, "participants").await, 1);
        assert_eq!(count_rows(&pool, "session_participants").await, 1);
    }

    #[tokio::test]
    async fn test_membership_inactive_after_expiry() {
        let (pool, repo) = setup_test_repo().await;
        let created = create(&repo, "Alice", "EXP001").await;
        expire_session(&pool, created.session_id).await;

        assert!(!repo
            .is_active_member(created.session_id, created.participant_id, Utc::now())
            .await
            .unwrap());
        let session = repo.get_by_id(created.session_id).await.unwrap().unwrap();
        assert!(!session.is_active_at(Utc::now()));
    }

    #[tokio::test]
    async fn test_get_participant() {
        let (_pool, repo) = setup_test_repo().await;
        let created = create(&repo, "Alice", "PART01").await;

        let participant = repo.get_participant(created.participant_id).await.unwrap().unwrap();
        assert_eq!(participant.display_name, "Alice");
        assert!(repo.get_participant(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_nonexistent_session() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.get_by_id(42).await.unwrap().is_none());
        assert!(repo.get_active_by_code("ZZZZZZ", Utc::now()).await.unwrap().is_none());
    }

    mod mysql {
        use super::*;
        use crate::db::pool::mysql_test_pool;
        use crate::services::code::generate_candidate_code;

        async fn create_random(repo: &dyn SessionRepository, name: &str) -> Option<CreatedSession> {
            let now = Utc::now();
            let mut next_code = || generate_candidate_code(&mut rand::thread_rng());
            repo.create_with_host(name, &mut next_code, 32, now, now + Duration::hours(24))
                .await
                .expect("Failed to create session")
        }

        #[tokio::test]
        #[ignore = "Requires MySQL server"]
        async fn test_mysql_create_and_join() {
            let repo = SqlxSessionRepository::new(mysql_test_pool().await);
            let created = create_random(&repo, "Alice").await.expect("Code should be free");

            let joined = repo
                .join_by_code(&created.code, "Bob", Utc::now())
                .await
                .unwrap()
                .expect("Session should be joinable");
            assert_eq!(joined.session_id, created.session_id);

            let names = repo.list_participant_names(created.session_id).await.unwrap();
            assert_eq!(names, vec!["Alice", "Bob"]);
            assert!(repo
                .is_active_member(created.session_id, joined.participant_id, Utc::now())
                .await
                .unwrap());
        }

        #[tokio::test]
        #[ignore = "Requires MySQL server"]
        async fn test_mysql_concurrent_creates_all_succeed() {
            let repo = SqlxSessionRepository::boxed(mysql_test_pool().await);

            let creates = (0..16).map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move { create_random(repo.as_ref(), &format!("Host{}", i)).await })
            });
            let created: Vec<CreatedSession> = futures::future::join_all(creates)
                .await
                .into_iter()
                .map(|r| r.expect("create task panicked").expect("Code should be free"))
                .collect();

            let mut codes: Vec<&str> = created.iter().map(|c| c.code.as_str()).collect();
            codes.sort();
            codes.dedup();
            assert_eq!(codes.len(), 16);
        }
    }
}
