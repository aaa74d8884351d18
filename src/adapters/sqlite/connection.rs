//! SQLite connection management.
//!
//! WAL journal with a generous busy timeout: the deadline-expiry tasks
//! and request handlers write concurrently, and SQLite serializes
//! writers at the connection level rather than ours.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid database URL: {0}")]
    BadUrl(String),
    #[error("Could not create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not open database: {0}")]
    Open(#[source] sqlx::Error),
    #[error("Database ping failed: {0}")]
    Ping(#[source] sqlx::Error),
}

/// Pool sizing knobs, surfaced through the `database` config section.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(3),
        }
    }
}

fn base_options(database_url: &str) -> Result<SqliteConnectOptions, ConnectionError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|_| ConnectionError::BadUrl(database_url.to_string()))?;
    Ok(options
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true))
}

/// Open (creating if missing) the database behind `database_url`.
pub async fn create_pool(
    database_url: &str,
    config: Option<PoolConfig>,
) -> Result<SqlitePool, ConnectionError> {
    let config = config.unwrap_or_default();
    ensure_parent_directory(database_url)?;

    let options = base_options(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(30));

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}

/// In-memory pool for tests. Single connection so every query sees the
/// same memory database.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    let options = base_options("sqlite::memory:")?.shared_cache(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}

pub async fn verify_connection(pool: &SqlitePool) -> Result<(), ConnectionError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(ConnectionError::Ping)?;
    Ok(())
}

/// sqlx will create the file but not its directory.
fn ensure_parent_directory(database_url: &str) -> Result<(), ConnectionError> {
    let file = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    if file.is_empty() || file == ":memory:" {
        return Ok(());
    }

    match Path::new(file).parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent).map_err(|source| ConnectionError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
