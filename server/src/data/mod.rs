//! Data storage layer
//!
//! - `filters` - Filter expression compiler (tree, registry, scoping, SQL)
//! - `sql` - Per-backend SQL dialects
//! - `exec` - Query execution adapter shared by all stores
//! - `sqlite` / `postgres` - Row stores over the normalized log tables
//! - `duckdb` / `clickhouse` - Column stores over the denormalized log tables
//! - `error` - Store, execution and decode errors
//!
//! ## Backend Support
//!
//! `RowStoreService` and `ColumnStoreService` wrap one backend each, picked
//! by configuration, and hand out a `QueryExecutor` for it.

pub mod clickhouse;
pub mod duckdb;
pub mod error;
pub mod exec;
pub mod filters;
pub mod postgres;
pub mod sql;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod fixtures;

pub use clickhouse::ClickhouseService;
pub use duckdb::DuckdbService;
pub use postgres::PostgresService;
pub use sqlite::SqliteService;

pub use error::{DataError, DecodeError, ExecError};
pub use exec::{ColumnKind, ColumnSpec, QueryExecutor, RowShape, StoreRow, execute};

use std::sync::Arc;

use crate::core::config::{ColumnStoreBackend, DatabaseConfig, RowStoreBackend};
use sql::Backend;

/// Row store service enum
///
/// Wraps the normalized request log store (SQLite or PostgreSQL).
pub enum RowStoreService {
    /// SQLite backend (default, embedded)
    Sqlite(Arc<SqliteService>),
    /// PostgreSQL backend (for multi-tenant deployments)
    Postgres(Arc<PostgresService>),
}

impl RowStoreService {
    /// Initialize the configured row store
    pub async fn init(config: &DatabaseConfig) -> Result<Self, DataError> {
        let timeout = config.query_timeout();
        match config.row_store {
            RowStoreBackend::Sqlite => {
                let service = SqliteService::init(&config.sqlite_path, timeout).await?;
                Ok(Self::Sqlite(Arc::new(service)))
            }
            RowStoreBackend::Postgres => {
                let postgres = config.postgres.as_ref().ok_or_else(|| {
                    DataError::Config("PostgreSQL configuration required".to_string())
                })?;
                let service = PostgresService::init(postgres, timeout).await?;
                Ok(Self::Postgres(Arc::new(service)))
            }
        }
    }

    pub fn executor(&self) -> &dyn QueryExecutor {
        match self {
            Self::Sqlite(s) => s,
            Self::Postgres(p) => p,
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Sqlite(_) => Backend::Sqlite,
            Self::Postgres(_) => Backend::Postgres,
        }
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        match self {
            Self::Sqlite(s) => s.close().await,
            Self::Postgres(p) => p.close().await,
        }
    }
}

/// Column store service enum
///
/// Wraps the denormalized analytics store (DuckDB or ClickHouse).
pub enum ColumnStoreService {
    /// DuckDB backend (default, embedded)
    Duckdb(Arc<DuckdbService>),
    /// ClickHouse backend (for distributed deployments)
    Clickhouse(Arc<ClickhouseService>),
}

impl ColumnStoreService {
    /// Initialize the configured column store
    pub async fn init(config: &DatabaseConfig) -> Result<Self, DataError> {
        let timeout = config.query_timeout();
        match config.column_store {
            ColumnStoreBackend::Duckdb => {
                let service = DuckdbService::init(&config.duckdb_path, timeout).await?;
                Ok(Self::Duckdb(Arc::new(service)))
            }
            ColumnStoreBackend::Clickhouse => {
                let clickhouse = config.clickhouse.as_ref().ok_or_else(|| {
                    DataError::Config("ClickHouse configuration required".to_string())
                })?;
                let service = ClickhouseService::init(clickhouse, timeout).await?;
                Ok(Self::Clickhouse(Arc::new(service)))
            }
        }
    }

    pub fn executor(&self) -> &dyn QueryExecutor {
        match self {
            Self::Duckdb(d) => d,
            Self::Clickhouse(c) => c,
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Duckdb(_) => Backend::Duckdb,
            Self::Clickhouse(_) => Backend::Clickhouse,
        }
    }

    /// Close the store gracefully
    pub async fn close(&self) -> Result<(), DataError> {
        match self {
            Self::Duckdb(d) => Arc::clone(d).close().await,
            Self::Clickhouse(_) => Ok(()),
        }
    }
}
