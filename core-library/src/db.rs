//! # Library Database
//!
//! Opens the SQLite library and applies the embedded migrations.
//!
//! File databases run in WAL mode so status queries can read while a scan
//! batch is being written. Foreign keys are always on; the association
//! tables rely on `ON DELETE CASCADE` when recordings are reaped.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("library.db")).await?;
//! ```
//!
//! An in-memory pool holds a single connection so every query sees the same
//! database. Never query the pool while holding one of its transactions.

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Writers wait this long for the lock held by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// `sqlite:` URL of the library file, or `sqlite::memory:`
    pub database_url: String,
    pub max_connections: u32,
    /// `None` keeps idle connections open, which an in-memory database needs
    pub idle_timeout: Option<Duration>,
}

impl DatabaseConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_url: format!("sqlite:{}", database_path.into().display()),
            max_connections: 5,
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }

    /// A private in-memory database living as long as the pool
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            idle_timeout: None,
        }
    }
}

/// Open the pool and bring the schema up to date
///
/// # Errors
///
/// `LibraryError::Database` if the file cannot be opened, or
/// `LibraryError::Migration` if a migration fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LibraryError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT)
        .create_if_missing(true);

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .idle_timeout(config.idle_timeout);
    if config.idle_timeout.is_none() {
        pool_options = pool_options.min_connections(1).max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(database_url = %config.database_url, error = %e, "Failed to open library database");
            LibraryError::Database(e)
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| LibraryError::Migration(e.to_string()))?;

    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Library database ready"
    );

    Ok(pool)
}

/// In-memory library with migrations applied
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}
