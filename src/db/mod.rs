//! Database layer
//!
//! Durable store for sessions, participants, memberships, votes and the
//! movie catalog. It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for shared deployments)
//!
//! The database driver is selected based on configuration.
//!
//! # Architecture
//!
//! The database layer uses a trait-based abstraction (`DatabasePool`) so the
//! repositories can serve either backend. The database is the only state
//! shared between requests; services hold no session data in memory.
//!
//! # Usage
//!
//! ```ignore
//! use cinematch::config::DatabaseConfig;
//! use cinematch::db::{create_pool, DatabasePool, migrations};
//!
//! let config = DatabaseConfig::default();
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, is_retryable_mysql_error, DatabasePool, DynDatabasePool,
    MysqlDatabase, SqliteDatabase, MYSQL_TRANSACTION_ROUNDS,
};
