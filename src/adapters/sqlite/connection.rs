//! Connection pools for the SQLite scored store.
//!
//! File databases run in WAL mode with a busy timeout so concurrent
//! increments from several pool connections queue instead of failing. An
//! in-memory database lives only as long as its single connection, so its
//! pool never recycles that connection.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::errors::StoreError;
use crate::domain::models::StorageConfig;

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to create database directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open database: {0}")]
    Open(#[source] sqlx::Error),

    #[error("Database did not answer: {0}")]
    Ping(#[source] sqlx::Error),
}

impl From<ConnectionError> for StoreError {
    fn from(err: ConnectionError) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Where a database URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Classify `sqlite:` / `sqlite://` URLs. Query parameters are ignored.
    pub fn parse(database_url: &str) -> Result<Self, ConnectionError> {
        let rest = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .ok_or_else(|| ConnectionError::InvalidUrl(database_url.to_string()))?;
        let path = rest.split_once('?').map_or(rest, |(path, _)| path);

        match path {
            "" => Err(ConnectionError::InvalidUrl(database_url.to_string())),
            ":memory:" => Ok(Self::Memory),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }

    fn ensure_parent_dir(&self) -> Result<(), ConnectionError> {
        let Self::File(path) = self else {
            return Ok(());
        };
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                std::fs::create_dir_all(parent).map_err(|source| ConnectionError::Directory {
                    path: parent.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Pool sizing and timeouts.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(3),
            busy_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&StorageConfig> for PoolConfig {
    fn from(storage: &StorageConfig) -> Self {
        Self {
            max_connections: storage.max_connections,
            min_connections: storage.max_connections.min(1),
            ..Self::default()
        }
    }
}

/// Open a pool for `database_url`, creating the file and its directory
/// if they do not exist yet.
pub async fn create_pool(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, ConnectionError> {
    let location = DatabaseLocation::parse(database_url)?;
    let config = config.unwrap_or_default();

    let options = match &location {
        DatabaseLocation::Memory => return open_memory().await,
        DatabaseLocation::File(path) => {
            location.ensure_parent_dir()?;
            file_options(path, &config)
        }
    };

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}

/// In-memory pool for tests.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    open_memory().await
}

fn file_options(path: &Path, config: &PoolConfig) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.busy_timeout)
}

async fn open_memory() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::from_str(MEMORY_URL)
        .map_err(|_| ConnectionError::InvalidUrl(MEMORY_URL.to_string()))?;

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}

/// Round-trip a trivial query.
pub async fn ping(pool: &SqlitePool) -> Result<(), ConnectionError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(ConnectionError::Ping)?;
    Ok(())
}
