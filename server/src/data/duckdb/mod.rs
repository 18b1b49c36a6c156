//! DuckDB column store service
//!
//! Embedded analytics over the denormalized request log tables.
//! Uses a single shared connection protected by a mutex; every query runs
//! on the blocking pool.

mod executor;
mod migrations;
pub mod schema;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use duckdb::Connection;
use parking_lot::Mutex;

use crate::data::error::{DataError, ExecError};
use crate::data::sql::Backend;

/// DuckDB column store service
pub struct DuckdbService {
    conn: Mutex<Option<Connection>>,
    query_timeout: Duration,
}

impl Drop for DuckdbService {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get_mut().take()
            && let Err((_, e)) = conn.close()
        {
            tracing::warn!("DuckDB connection close failed during drop: {}", e);
        }
    }
}

impl DuckdbService {
    /// Open (or create) the database file and apply the schema
    pub async fn init(db_path: &Path, query_timeout: Duration) -> Result<Self, DataError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let path = db_path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            conn.execute_batch(
                "SET autoinstall_known_extensions = false;
                 SET autoload_known_extensions = false;
                 PRAGMA enable_checkpoint_on_shutdown;",
            )?;
            migrations::run_migrations(&conn)?;
            Ok::<_, DataError>(conn)
        })
        .await
        .map_err(|e| DataError::Io(std::io::Error::other(e)))??;

        tracing::debug!(path = %db_path.display(), "DuckdbService initialized");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            query_timeout,
        })
    }

    /// Create a migrated in-memory database (testing only)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, DataError> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            query_timeout: Duration::from_secs(5),
        })
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Run `f` with exclusive access to the open connection
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, ExecError>,
    ) -> Result<T, ExecError> {
        let guard = self.conn.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(ExecError::Unavailable {
                backend: Backend::Duckdb,
                reason: "connection closed".to_string(),
            }),
        }
    }

    /// Run a blocking closure on the blocking pool, bounded by the query timeout
    pub async fn run_query<T, F>(self: &Arc<Self>, f: F) -> Result<T, ExecError>
    where
        T: Send + 'static,
        F: FnOnce(&DuckdbService) -> Result<T, ExecError> + Send + 'static,
    {
        let db = Arc::clone(self);
        let timeout = self.query_timeout;
        tokio::time::timeout(timeout, tokio::task::spawn_blocking(move || f(&db)))
            .await
            .map_err(|_| {
                tracing::warn!("DuckDB query timed out after {}s", timeout.as_secs());
                ExecError::Timeout {
                    backend: Backend::Duckdb,
                    timeout_secs: timeout.as_secs(),
                }
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "DuckDB query task failed");
                ExecError::Store {
                    backend: Backend::Duckdb,
                    message: format!("query task failed: {}", e),
                    retryable: false,
                }
            })?
    }

    /// Checkpoint and close the connection
    pub async fn close(self: Arc<Self>) -> Result<(), DataError> {
        tokio::task::spawn_blocking(move || {
            let mut guard = self.conn.lock();
            if let Some(conn) = guard.take() {
                if let Err(e) = conn.execute("CHECKPOINT", []) {
                    tracing::warn!("CHECKPOINT failed during close: {}", e);
                }
                conn.close().map_err(|(_, e)| DataError::Duckdb(e))?;
                tracing::debug!("DuckDB connection closed");
            }
            Ok(())
        })
        .await
        .map_err(|e| DataError::Io(std::io::Error::other(e)))?
    }
}

/// Execute a function within a transaction, rolling back on error
pub(crate) fn in_transaction<F, T>(conn: &Connection, f: F) -> Result<T, DataError>
where
    F: FnOnce(&Connection) -> Result<T, DataError>,
{
    conn.execute_batch("BEGIN TRANSACTION")?;
    match f(conn) {
        Ok(val) => {
            conn.execute_batch("COMMIT")?;
            Ok(val)
        }
        Err(e) => {
            if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                tracing::warn!("ROLLBACK failed after transaction error: {}", rollback_err);
            }
            Err(e)
        }
    }
}
