//! Error types for the data layer
//!
//! `DataError` covers service initialization (connections, schema, config).
//! `ExecError` covers running a compiled query, and `DecodeError` covers
//! turning the returned rows into typed values.

use thiserror::Error;

use crate::data::sql::Backend;

/// Error raised while initializing or maintaining a store
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error (row store)
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// PostgreSQL database error (row store)
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// DuckDB database error (column store)
    #[error("DuckDB error: {0}")]
    Duckdb(#[from] duckdb::Error),

    /// ClickHouse database error (column store)
    #[error("ClickHouse error: {0}")]
    Clickhouse(#[from] clickhouse::error::Error),

    /// Schema setup failed
    #[error("Schema setup failed on {backend}: {error}")]
    SchemaFailed {
        backend: &'static str,
        error: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Create a SQLite error with preserved context
    pub fn from_sqlite(e: sqlx::Error) -> Self {
        Self::Sqlite(e)
    }

    /// Create a PostgreSQL error with preserved context
    pub fn from_postgres(e: sqlx::Error) -> Self {
        Self::Postgres(e)
    }

    /// Create a schema setup error
    pub fn schema_failed(backend: &'static str, error: impl ToString) -> Self {
        Self::SchemaFailed {
            backend,
            error: error.to_string(),
        }
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(e) | Self::Postgres(e) => sqlx_is_transient(e),
            Self::Duckdb(_) => false,
            Self::Clickhouse(e) => clickhouse_is_transient(e),
            _ => false,
        }
    }

    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
            Self::Duckdb(_) => "duckdb",
            Self::Clickhouse(_) => "clickhouse",
            Self::SchemaFailed { backend, .. } => backend,
            Self::Config(_) | Self::Io(_) => "unknown",
        }
    }
}

/// Error raised while decoding a result row
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Missing column {column}")]
    MissingColumn { column: String },

    #[error("Column {column} expected {expected}, got {actual}")]
    WrongType {
        column: String,
        expected: &'static str,
        actual: String,
    },

    #[error("Unexpected NULL in column {column}")]
    UnexpectedNull { column: String },

    #[error("Row does not match declared shape: {0}")]
    Shape(String),
}

/// Error raised while executing a compiled query
#[derive(Error, Debug)]
pub enum ExecError {
    /// Store or network failure
    #[error("{backend} query failed: {message}")]
    Store {
        backend: Backend,
        message: String,
        retryable: bool,
    },

    /// Query timeout
    #[error("Query timeout after {timeout_secs}s on {backend}")]
    Timeout { backend: Backend, timeout_secs: u64 },

    /// Query was compiled for another backend
    #[error("Query compiled for {compiled} cannot run on {executor}")]
    DialectMismatch { compiled: Backend, executor: Backend },

    /// Returned rows did not match the declared columns
    #[error("Failed to decode result: {0}")]
    Decode(#[from] DecodeError),

    /// Backend not available
    #[error("Backend {backend} is not available: {reason}")]
    Unavailable { backend: Backend, reason: String },
}

impl ExecError {
    pub fn from_sqlx(backend: Backend, e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::ColumnNotFound(column) => DecodeError::MissingColumn { column }.into(),
            sqlx::Error::PoolClosed => Self::Unavailable {
                backend,
                reason: "connection pool closed".to_string(),
            },
            e => Self::Store {
                backend,
                retryable: sqlx_is_transient(&e),
                message: e.to_string(),
            },
        }
    }

    pub fn from_duckdb(e: duckdb::Error) -> Self {
        Self::Store {
            backend: Backend::Duckdb,
            message: e.to_string(),
            retryable: false,
        }
    }

    pub fn from_clickhouse(e: clickhouse::error::Error) -> Self {
        Self::Store {
            backend: Backend::Clickhouse,
            retryable: clickhouse_is_transient(&e),
            message: e.to_string(),
        }
    }

    /// Whether a caller may retry the same query unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { retryable, .. } => *retryable,
            Self::Timeout { .. } | Self::Unavailable { .. } => true,
            Self::DialectMismatch { .. } | Self::Decode(_) => false,
        }
    }

    /// Get the backend that generated this error
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Self::Store { backend, .. }
            | Self::Timeout { backend, .. }
            | Self::Unavailable { backend, .. } => Some(*backend),
            Self::DialectMismatch { executor, .. } => Some(*executor),
            Self::Decode(_) => None,
        }
    }
}

fn sqlx_is_transient(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    )
}

fn clickhouse_is_transient(e: &clickhouse::error::Error) -> bool {
    let message = e.to_string();
    message.contains("connection") || message.contains("timeout") || message.contains("network")
}
