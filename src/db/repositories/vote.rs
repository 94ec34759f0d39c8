//! Vote repository
//!
//! Database operations for the per-session vote ledger and the like tallies
//! match detection reads from it.
//!
//! A vote is recorded with a single guarded `INSERT ... SELECT` that only
//! produces a row when the voter is a member of an active session and the
//! movie exists; the unique key on (session, participant, movie) turns a
//! duplicate into an ignored insert. When nothing was inserted the same
//! transaction works out why.

use crate::config::DatabaseDriver;
use crate::db::{is_retryable_mysql_error, DynDatabasePool, MYSQL_TRANSACTION_ROUNDS};
use crate::models::{
    CastVote, MatchTally, Movie, MovieWithStats, RecordedVote, Vote, VoteKind, VoteOutcome,
    VoteStats,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Vote repository trait
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Atomically record a vote. Likes carry the movie's tally as seen by the
    /// transaction that inserted them.
    async fn record(&self, vote: &CastVote, now: DateTime<Utc>) -> Result<VoteOutcome>;

    /// Current like tally for one movie in a session, `None` if the movie does not exist
    async fn tally(&self, session_id: i64, movie_id: i64) -> Result<Option<MatchTally>>;

    /// Like tallies for every movie with at least one like in the session
    async fn session_tallies(&self, session_id: i64) -> Result<Vec<MatchTally>>;

    /// Catalog movies the participant has not voted on in this session, with
    /// the session's vote counts, ordered by movie ID
    async fn list_unvoted(&self, session_id: i64, participant_id: i64)
        -> Result<Vec<MovieWithStats>>;
}

/// SQLx-based vote repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxVoteRepository {
    pool: DynDatabasePool,
}

impl SqlxVoteRepository {
    /// Create a new SQLx vote repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VoteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VoteRepository for SqlxVoteRepository {
    async fn record(&self, vote: &CastVote, now: DateTime<Utc>) -> Result<VoteOutcome> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => record_vote_sqlite(self.pool.sqlite()?, vote, now).await,
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let mut round = 1;
                loop {
                    match record_vote_mysql(pool, vote, now).await {
                        Err(e) if round < MYSQL_TRANSACTION_ROUNDS && is_retryable_mysql_error(&e) => {
                            tracing::debug!("Retrying vote insert (round {}): {:#}", round, e);
                            round += 1;
                        }
                        other => return other,
                    }
                }
            }
        }
    }

    async fn tally(&self, session_id: i64, movie_id: i64) -> Result<Option<MatchTally>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut conn = self.pool.sqlite()?.acquire().await.context("Failed to acquire connection")?;
                load_tally_sqlite(&mut conn, session_id, movie_id).await
            }
            DatabaseDriver::Mysql => {
                let mut conn = self.pool.mysql()?.acquire().await.context("Failed to acquire connection")?;
                load_tally_mysql(&mut conn, session_id, movie_id).await
            }
        }
    }

    async fn session_tallies(&self, session_id: i64) -> Result<Vec<MatchTally>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => session_tallies_sqlite(self.pool.sqlite()?, session_id).await,
            DatabaseDriver::Mysql => session_tallies_mysql(self.pool.mysql()?, session_id).await,
        }
    }

    async fn list_unvoted(
        &self,
        session_id: i64,
        participant_id: i64,
    ) -> Result<Vec<MovieWithStats>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_unvoted_sqlite(self.pool.sqlite()?, session_id, participant_id).await
            }
            DatabaseDriver::Mysql => {
                list_unvoted_mysql(self.pool.mysql()?, session_id, participant_id).await
            }
        }
    }
}

const SELECT_ACTIVE_MEMBERSHIP_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM session_participants sp
    JOIN sessions s ON s.id = sp.session_id
    WHERE sp.session_id = ? AND sp.participant_id = ? AND s.expires_at > ?
"#;

const SELECT_MOVIE: &str = "SELECT id, title, poster_url, year, genre FROM movies WHERE id = ?";

const SELECT_MEMBER_COUNT: &str =
    "SELECT COUNT(*) FROM session_participants WHERE session_id = ?";

const SELECT_LIKERS: &str = r#"
    SELECT p.display_name
    FROM votes v
    JOIN participants p ON p.id = v.participant_id
    WHERE v.session_id = ? AND v.movie_id = ? AND v.vote = 'like'
    ORDER BY p.display_name ASC
"#;

const SELECT_SESSION_LIKES: &str = r#"
    SELECT m.id, m.title, m.poster_url, m.year, m.genre, p.display_name
    FROM votes v
    JOIN movies m ON m.id = v.movie_id
    JOIN participants p ON p.id = v.participant_id
    WHERE v.session_id = ? AND v.vote = 'like'
    ORDER BY m.id ASC, p.display_name ASC
"#;

const SELECT_UNVOTED_WITH_STATS: &str = r#"
    SELECT m.id, m.title, m.poster_url, m.year, m.genre,
           COUNT(CASE WHEN v.vote = 'like' THEN 1 END) AS likes,
           COUNT(CASE WHEN v.vote = 'dislike' THEN 1 END) AS dislikes
    FROM movies m
    LEFT JOIN votes v ON v.movie_id = m.id AND v.session_id = ?
    WHERE m.id NOT IN (
        SELECT mine.movie_id FROM votes mine
        WHERE mine.session_id = ? AND mine.participant_id = ?
    )
    GROUP BY m.id, m.title, m.poster_url, m.year, m.genre
    ORDER BY m.id ASC
"#;

/// Fold like rows, already ordered by movie, into one tally per movie.
fn group_tallies(
    rows: impl IntoIterator<Item = (Movie, String)>,
    total_participants: i64,
) -> Vec<MatchTally> {
    let mut tallies: BTreeMap<i64, MatchTally> = BTreeMap::new();
    for (movie, liker) in rows {
        tallies
            .entry(movie.id)
            .or_insert_with(|| MatchTally {
                movie,
                total_participants,
                likers: Vec::new(),
            })
            .likers
            .push(liker);
    }
    tallies.into_values().collect()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn record_vote_sqlite(
    pool: &SqlitePool,
    vote: &CastVote,
    now: DateTime<Utc>,
) -> Result<VoteOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO votes (session_id, participant_id, movie_id, vote, created_at)
        SELECT sp.session_id, sp.participant_id, m.id, ?, ?
        FROM session_participants sp
        JOIN sessions s ON s.id = sp.session_id
        JOIN movies m ON m.id = ?
        WHERE sp.session_id = ? AND sp.participant_id = ? AND s.expires_at > ?
        "#,
    )
    .bind(vote.vote.to_string())
    .bind(now)
    .bind(vote.movie_id)
    .bind(vote.session_id)
    .bind(vote.participant_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to record vote")?;

    if result.rows_affected() == 0 {
        let outcome = classify_rejected_vote_sqlite(&mut tx, vote, now).await?;
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(outcome);
    }

    let recorded = Vote {
        id: result.last_insert_rowid(),
        session_id: vote.session_id,
        participant_id: vote.participant_id,
        movie_id: vote.movie_id,
        vote: vote.vote,
        created_at: now,
    };

    let tally = match vote.vote {
        VoteKind::Like => load_tally_sqlite(&mut tx, vote.session_id, vote.movie_id).await?,
        VoteKind::Dislike => None,
    };

    tx.commit().await.context("Failed to commit vote")?;

    Ok(VoteOutcome::Recorded(RecordedVote {
        vote: recorded,
        tally,
    }))
}

async fn classify_rejected_vote_sqlite(
    conn: &mut SqliteConnection,
    vote: &CastVote,
    now: DateTime<Utc>,
) -> Result<VoteOutcome> {
    let memberships: i64 = sqlx::query_scalar(SELECT_ACTIVE_MEMBERSHIP_COUNT)
        .bind(vote.session_id)
        .bind(vote.participant_id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to check session membership")?;
    if memberships == 0 {
        return Ok(VoteOutcome::NotMember);
    }

    let movie = sqlx::query(SELECT_MOVIE)
        .bind(vote.movie_id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to look up movie")?;
    if movie.is_none() {
        return Ok(VoteOutcome::UnknownMovie);
    }

    Ok(VoteOutcome::AlreadyVoted)
}

async fn load_tally_sqlite(
    conn: &mut SqliteConnection,
    session_id: i64,
    movie_id: i64,
) -> Result<Option<MatchTally>> {
    let Some(row) = sqlx::query(SELECT_MOVIE)
        .bind(movie_id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to look up movie")?
    else {
        return Ok(None);
    };
    let movie = row_to_movie_sqlite(&row);

    let total_participants: i64 = sqlx::query_scalar(SELECT_MEMBER_COUNT)
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count session participants")?;

    let likers: Vec<String> = sqlx::query_scalar(SELECT_LIKERS)
        .bind(session_id)
        .bind(movie_id)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list likers")?;

    Ok(Some(MatchTally {
        movie,
        total_participants,
        likers,
    }))
}

async fn session_tallies_sqlite(pool: &SqlitePool, session_id: i64) -> Result<Vec<MatchTally>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let total_participants: i64 = sqlx::query_scalar(SELECT_MEMBER_COUNT)
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count session participants")?;

    let rows = sqlx::query(SELECT_SESSION_LIKES)
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list session likes")?;

    tx.commit().await.context("Failed to finish tally read")?;

    Ok(group_tallies(
        rows.iter()
            .map(|row| (row_to_movie_sqlite(row), row.get::<String, _>("display_name"))),
        total_participants,
    ))
}

async fn list_unvoted_sqlite(
    pool: &SqlitePool,
    session_id: i64,
    participant_id: i64,
) -> Result<Vec<MovieWithStats>> {
    let rows = sqlx::query(SELECT_UNVOTED_WITH_STATS)
        .bind(session_id)
        .bind(session_id)
        .bind(participant_id)
        .fetch_all(pool)
        .await
        .context("Failed to list unvoted movies")?;

    Ok(rows
        .iter()
        .map(|row| {
            MovieWithStats::new(
                row_to_movie_sqlite(row),
                VoteStats {
                    likes: row.get("likes"),
                    dislikes: row.get("dislikes"),
                },
            )
        })
        .collect())
}

pub(crate) fn row_to_movie_sqlite(row: &sqlx::sqlite::SqliteRow) -> Movie {
    Movie {
        id: row.get("id"),
        title: row.get("title"),
        poster_url: row.get("poster_url"),
        year: row.get("year"),
        genre: row.get("genre"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn record_vote_mysql(
    pool: &MySqlPool,
    vote: &CastVote,
    now: DateTime<Utc>,
) -> Result<VoteOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT IGNORE INTO votes (session_id, participant_id, movie_id, vote, created_at)
        SELECT sp.session_id, sp.participant_id, m.id, ?, ?
        FROM session_participants sp
        JOIN sessions s ON s.id = sp.session_id
        JOIN movies m ON m.id = ?
        WHERE sp.session_id = ? AND sp.participant_id = ? AND s.expires_at > ?
        "#,
    )
    .bind(vote.vote.to_string())
    .bind(now)
    .bind(vote.movie_id)
    .bind(vote.session_id)
    .bind(vote.participant_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to record vote")?;

    if result.rows_affected() == 0 {
        let outcome = classify_rejected_vote_mysql(&mut tx, vote, now).await?;
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(outcome);
    }

    let recorded = Vote {
        id: result.last_insert_id() as i64,
        session_id: vote.session_id,
        participant_id: vote.participant_id,
        movie_id: vote.movie_id,
        vote: vote.vote,
        created_at: now,
    };

    let tally = match vote.vote {
        VoteKind::Like => load_tally_mysql(&mut tx, vote.session_id, vote.movie_id).await?,
        VoteKind::Dislike => None,
    };

    tx.commit().await.context("Failed to commit vote")?;

    Ok(VoteOutcome::Recorded(RecordedVote {
        vote: recorded,
        tally,
    }))
}

async fn classify_rejected_vote_mysql(
    conn: &mut MySqlConnection,
    vote: &CastVote,
    now: DateTime<Utc>,
) -> Result<VoteOutcome> {
    let memberships: i64 = sqlx::query_scalar(SELECT_ACTIVE_MEMBERSHIP_COUNT)
        .bind(vote.session_id)
        .bind(vote.participant_id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to check session membership")?;
    if memberships == 0 {
        return Ok(VoteOutcome::NotMember);
    }

    let movie = sqlx::query(SELECT_MOVIE)
        .bind(vote.movie_id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to look up movie")?;
    if movie.is_none() {
        return Ok(VoteOutcome::UnknownMovie);
    }

    Ok(VoteOutcome::AlreadyVoted)
}

async fn load_tally_mysql(
    conn: &mut MySqlConnection,
    session_id: i64,
    movie_id: i64,
) -> Result<Option<MatchTally>> {
    let Some(row) = sqlx::query(SELECT_MOVIE)
        .bind(movie_id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to look up movie")?
    else {
        return Ok(None);
    };
    let movie = row_to_movie_mysql(&row);

    let total_participants: i64 = sqlx::query_scalar(SELECT_MEMBER_COUNT)
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count session participants")?;

    let likers: Vec<String> = sqlx::query_scalar(SELECT_LIKERS)
        .bind(session_id)
        .bind(movie_id)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list likers")?;

    Ok(Some(MatchTally {
        movie,
        total_participants,
        likers,
    }))
}

async fn session_tallies_mysql(pool: &MySqlPool, session_id: i64) -> Result<Vec<MatchTally>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let total_participants: i64 = sqlx::query_scalar(SELECT_MEMBER_COUNT)
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count session participants")?;

    let rows = sqlx::query(SELECT_SESSION_LIKES)
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list session likes")?;

    tx.commit().await.context("Failed to finish tally read")?;

    Ok(group_tallies(
        rows.iter()
            .map(|row| (row_to_movie_mysql(row), row.get::<String, _>("display_name"))),
        total_participants,
    ))
}

async fn list_unvoted_mysql(
    pool: &MySqlPool,
    session_id: i64,
    participant_id: i64,
) -> Result<Vec<MovieWithStats>> {
    let rows = sqlx::query(SELECT_UNVOTED_WITH_STATS)
        .bind(session_id)
        .bind(session_id)
        .bind(participant_id)
        .fetch_all(pool)
        .await
        .context("Failed to list unvoted movies")?;

    Ok(rows
        .iter()
        .map(|row| {
            MovieWithStats::new(
                row_to_movie_mysql(row),
                VoteStats {
                    likes: row.get("likes"),
                    dislikes: row.get("dislikes"),
                },
            )
        })
        .collect())
}

pub(crate) fn row_to_movie_mysql(row: &sqlx::mysql::MySqlRow) -> Movie {
    Movie {
        id: row.get("id"),
        title: row.get("title"),
        poster_url: row.get("poster_url"),
        year: row.get("year"),
        genre: row.get("genre"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SessionRepository, SqlxSessionRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreatedSession;
    use chrono::Duration;

    struct Fixture {
        pool: DynDatabasePool,
        sessions: SqlxSessionRepository,
        votes: SqlxVoteRepository,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        for (id, title) in [(1, "Inception"), (2, "Amelie"), (3, "Heat")] {
            sqlx::query("INSERT INTO movies (id, title, year, genre) VALUES (?, ?, 2000, 'Drama')")
                .bind(id)
                .bind(title)
                .execute(pool.as_sqlite().unwrap())
                .await
                .expect("Failed to seed movie");
        }
        Fixture {
            sessions: SqlxSessionRepository::new(pool.clone()),
            votes: SqlxVoteRepository::new(pool.clone()),
            pool,
        }
    }

    async fn create_session(fx: &Fixture, host: &str, code: &str) -> CreatedSession {
        let now = Utc::now();
        let code = code.to_string();
        let mut next_code = move || code.clone();
        fx.sessions
            .create_with_host(host, &mut next_code, 1, now, now + Duration::hours(24))
            .await
            .unwrap()
            .unwrap()
    }

    async fn join(fx: &Fixture, code: &str, name: &str) -> i64 {
        fx.sessions
            .join_by_code(code, name, Utc::now())
            .await
            .unwrap()
            .unwrap()
            .participant_id
    }

    fn cast(session_id: i64, participant_id: i64, movie_id: i64, vote: VoteKind) -> CastVote {
        CastVote {
            session_id,
            participant_id,
            movie_id,
            vote,
        }
    }

    #[tokio::test]
    async fn test_record_like_returns_tally() {
        let fx = setup().await;
        let s = create_session(&fx, "Alice", "VOTE01").await;
        let bob = join(&fx, "VOTE01", "Bob").await;

        let outcome = fx
            .votes
            .record(&cast(s.session_id, s.participant_id, 1, VoteKind::Like), Utc::now())
            .await
            .unwrap();
        let VoteOutcome::Recorded(first) = outcome else {
            panic!("expected recorded vote, got {:?}", outcome);
        };
        let tally = first.tally.unwrap();
        assert_eq!(tally.movie.title, "Inception");
        assert_eq!(tally.total_participants, 2);
        assert_eq!(tally.likers, vec!["Alice"]);

        let outcome = fx
            .votes
            .record(&cast(s.session_id, bob, 1, VoteKind::Like), Utc::now())
            .await
            .unwrap();
        let VoteOutcome::Recorded(second) = outcome else {
            panic!("expected recorded vote");
        };
        assert_eq!(second.tally.unwrap().likers, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_record_dislike_has_no_tally() {
        let fx = setup().await;
        let s = create_session(&fx, "Alice", "VOTE02").await;

        let outcome = fx
            .votes
            .record(&cast(s.session_id, s.participant_id, 2, VoteKind::Dislike), Utc::now())
            .await
            .unwrap();
        match outcome {
            VoteOutcome::Recorded(recorded) => {
                assert_eq!(recorded.vote.vote, VoteKind::Dislike);
                assert!(recorded.tally.is_none());
            }
            other => panic!("expected recorded vote, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_vote_is_rejected() {
        let fx = setup().await;
        let s = create_session(&fx, "Alice", "VOTE03").await;
        let vote = cast(s.session_id, s.participant_id, 1, VoteKind::Like);

        assert!(matches!(
            fx.votes.record(&vote, Utc::now()).await.unwrap(),
            VoteOutcome::Recorded(_)
        ));
        // A different kind on the same movie is still a duplicate
        let flipped = cast(s.session_id, s.participant_id, 1, VoteKind::Dislike);
        assert_eq!(
            fx.votes.record(&flipped, Utc::now()).await.unwrap(),
            VoteOutcome::AlreadyVoted
        );

        let tally = fx.votes.tally(s.session_id, 1).await.unwrap().unwrap();
        assert_eq!(tally.like_count(), 1);
    }

    #[tokio::test]
    async fn test_non_member_and_unknown_movie() {
        let fx = setup().await;
        let s = create_session(&fx, "Alice", "VOTE04").await;
        let other = create_session(&fx, "Mallory", "VOTE05").await;

        assert_eq!(
            fx.votes
                .record(&cast(s.session_id, other.participant_id, 1, VoteKind::Like), Utc::now())
                .await
                .unwrap(),
            VoteOutcome::NotMember
        );
        assert_eq!(
            fx.votes
                .record(&cast(s.session_id, s.participant_id, 999, VoteKind::Like), Utc::now())
                .await
                .unwrap(),
            VoteOutcome::UnknownMovie
        );
    }

    #[tokio::test]
    async fn test_vote_after_expiry_is_not_member() {
        let fx = setup().await;
        let s = create_session(&fx, "Alice", "VOTE06").await;
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
            .bind(Utc::now() - Duration::seconds(1))
            .bind(s.session_id)
            .execute(fx.pool.as_sqlite().unwrap())
            .await
            .unwrap();

        assert_eq!(
            fx.votes
                .record(&cast(s.session_id, s.participant_id, 1, VoteKind::Like), Utc::now())
                .await
                .unwrap(),
            VoteOutcome::NotMember
        );
    }

    #[tokio::test]
    async fn test_list_unvoted_with_stats() {
        let fx = setup().await;
        let s = create_session(&fx, "Alice", "VOTE07").await;
        let bob = join(&fx, "VOTE07", "Bob").await;

        fx.votes
            .record(&cast(s.session_id, s.participant_id, 1, VoteKind::Like), Utc::now())
            .await
            .unwrap();
        fx.votes
            .record(&cast(s.session_id, bob, 2, VoteKind::Dislike), Utc::now())
            .await
            .unwrap();

        let unvoted = fx.votes.list_unvoted(s.session_id, s.participant_id).await.unwrap();
        let ids: Vec<i64> = unvoted.iter().map(|m| m.movie.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(unvoted[0].stats, VoteStats { likes: 0, dislikes: 1 });
        assert_eq!(unvoted[1].stats, VoteStats::default());

        let for_bob = fx.votes.list_unvoted(s.session_id, bob).await.unwrap();
        assert_eq!(for_bob[0].movie.id, 1);
        assert_eq!(for_bob[0].stats, VoteStats { likes: 1, dislikes: 0 });
    }

    #[tokio::test]
    async fn test_votes_are_scoped_to_session() {
        let fx = setup().await;
        let first = create_session(&fx, "Alice", "VOTE08").await;
        let second = create_session(&fx, "Carol", "VOTE09").await;

        fx.votes
            .record(&cast(first.session_id, first.participant_id, 1, VoteKind::Like), Utc::now())
            .await
            .unwrap();

        let unvoted = fx.votes.list_unvoted(second.session_id, second.participant_id).await.unwrap();
        assert_eq!(unvoted.len(), 3);
        assert!(unvoted.iter().all(|m| m.stats == VoteStats::default()));
        assert!(fx.votes.session_tallies(second.session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_tallies_groups_likes() {
        let fx = setup().await;
        let s = create_session(&fx, "Zoe", "VOTE10").await;
        let bob = join(&fx, "VOTE10", "Bob").await;

        for (participant, movie, kind) in [
            (s.participant_id, 1, VoteKind::Like),
            (bob, 1, VoteKind::Like),
            (bob, 3, VoteKind::Like),
            (s.participant_id, 3, VoteKind::Dislike),
        ] {
            fx.votes
                .record(&cast(s.session_id, participant, movie, kind), Utc::now())
                .await
                .unwrap();
        }

        let tallies = fx.votes.session_tallies(s.session_id).await.unwrap();
        assert_eq!(tallies.len(), 2);
        assert_eq!(tallies[0].movie.id, 1);
        assert_eq!(tallies[0].likers, vec!["Bob", "Zoe"]);
        assert_eq!(tallies[0].total_participants, 2);
        assert_eq!(tallies[1].movie.id, 3);
        assert_eq!(tallies[1].likers, vec!["Bob"]);
    }

    #[tokio::test]
    async fn test_tally_for_missing_movie() {
        let fx = setup().await;
        let s = create_session(&fx, "Alice", "VOTE11").await;
        assert!(fx.votes.tally(s.session_id, 404).await.unwrap().is_none());

        let empty = fx.votes.tally(s.session_id, 2).await.unwrap().unwrap();
        assert!(empty.likers.is_empty());
        assert_eq!(empty.total_participants, 1);
    }

    mod mysql {
        use super::*;
        use crate::db::pool::mysql_test_pool;
        use crate::services::code::generate_candidate_code;

        async fn seed_movie(pool: &DynDatabasePool) -> i64 {
            sqlx::query("INSERT INTO movies (title, year, genre) VALUES ('Heat', 1995, 'Crime')")
                .execute(pool.as_mysql().unwrap())
                .await
                .expect("Failed to seed movie")
                .last_insert_id() as i64
        }

        async fn create_random(sessions: &SqlxSessionRepository) -> CreatedSession {
            let now = Utc::now();
            let mut next_code = || generate_candidate_code(&mut rand::thread_rng());
            sessions
                .create_with_host("Alice", &mut next_code, 32, now, now + Duration::hours(24))
                .await
                .expect("Failed to create session")
                .expect("Code should be free")
        }

        #[tokio::test]
        #[ignore = "Requires MySQL server"]
        async fn test_mysql_vote_outcomes() {
            let pool = mysql_test_pool().await;
            let sessions = SqlxSessionRepository::new(pool.clone());
            let votes = SqlxVoteRepository::new(pool.clone());
            let movie_id = seed_movie(&pool).await;
            let s = create_random(&sessions).await;

            let like = cast(s.session_id, s.participant_id, movie_id, VoteKind::Like);
            assert!(matches!(
                votes.record(&like, Utc::now()).await.unwrap(),
                VoteOutcome::Recorded(_)
            ));
            assert!(matches!(
                votes.record(&like, Utc::now()).await.unwrap(),
                VoteOutcome::AlreadyVoted
            ));

            let unknown = cast(s.session_id, s.participant_id, i64::MAX, VoteKind::Like);
            assert!(matches!(
                votes.record(&unknown, Utc::now()).await.unwrap(),
                VoteOutcome::UnknownMovie
            ));
        }

        #[tokio::test]
        #[ignore = "Requires MySQL server"]
        async fn test_mysql_concurrent_duplicate_votes() {
            let pool = mysql_test_pool().await;
            let sessions = SqlxSessionRepository::new(pool.clone());
            let votes = SqlxVoteRepository::boxed(pool.clone());
            let movie_id = seed_movie(&pool).await;
            let s = create_random(&sessions).await;

            let attempts = (0..8).map(|_| {
                let votes = votes.clone();
                let vote = cast(s.session_id, s.participant_id, movie_id, VoteKind::Like);
                tokio::spawn(async move { votes.record(&vote, Utc::now()).await })
            });
            let outcomes: Vec<VoteOutcome> = futures::future::join_all(attempts)
                .await
                .into_iter()
                .map(|r| r.expect("vote task panicked").expect("vote failed"))
                .collect();

            let recorded = outcomes
                .iter()
                .filter(|o| matches!(o, VoteOutcome::Recorded(_)))
                .count();
            let duplicates = outcomes
                .iter()
                .filter(|o| matches!(o, VoteOutcome::AlreadyVoted))
                .count();
            assert_eq!((recorded, duplicates), (1, 7));
        }
    }
}
