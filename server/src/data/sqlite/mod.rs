//! SQLite row store service
//!
//! Embedded deployment of the normalized request log tables. The pool is
//! tuned for a single local user:
//! - WAL mode for concurrent reads during writes
//! - In-memory temp storage for fast queries
//!
//! For multi-tenant deployments, use PostgreSQL instead.

mod executor;
mod migrations;
pub mod schema;

pub use sqlx::SqlitePool;

use std::path::Path;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::log::LevelFilter;

use crate::core::constants::{SQLITE_BUSY_TIMEOUT_SECS, SQLITE_CACHE_SIZE, SQLITE_MAX_CONNECTIONS};
use crate::data::error::DataError;

/// SQLite row store service
///
/// Should be created once at startup and shared behind an `Arc`.
pub struct SqliteService {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteService {
    /// Open (or create) the database file and apply the schema
    pub async fn init(db_path: &Path, query_timeout: Duration) -> Result<Self, DataError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .pragma("cache_size", SQLITE_CACHE_SIZE)
            .pragma("temp_store", "MEMORY")
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(DataError::from_sqlite)?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(path = %db_path.display(), "SqliteService initialized");
        Ok(Self {
            pool,
            query_timeout,
        })
    }

    /// Create a migrated in-memory database (testing only)
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, DataError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(DataError::from_sqlite)?;
        migrations::run_migrations(&pool).await?;
        Ok(Self {
            pool,
            query_timeout: Duration::from_secs(5),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("SQLite pool closed");
    }
}
