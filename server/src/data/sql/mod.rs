//! SQL abstraction layer for multi-database support
//!
//! This module provides abstractions for generating SQL that works across
//! different database backends (DuckDB, PostgreSQL, SQLite, ClickHouse).

mod clickhouse_dialect;
mod dialect;
mod duckdb_dialect;
mod postgres_dialect;
mod sqlite_dialect;

pub use clickhouse_dialect::ClickhouseDialect;
pub use dialect::SqlDialect;
pub use duckdb_dialect::DuckdbDialect;
pub use postgres_dialect::PostgresDialect;
pub use sqlite_dialect::SqliteDialect;

use serde::{Deserialize, Serialize};

/// Store family: decides which field registry a query compiles against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreFamily {
    /// Normalized request/response/properties tables
    Row,
    /// Denormalized wide tables
    Column,
}

impl StoreFamily {
    pub fn name(&self) -> &'static str {
        match self {
            StoreFamily::Row => "row",
            StoreFamily::Column => "column",
        }
    }
}

impl std::fmt::Display for StoreFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Database backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Postgres,
    Duckdb,
    Clickhouse,
}

impl Backend {
    /// Get the SQL dialect for this backend
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Backend::Sqlite => &SqliteDialect,
            Backend::Postgres => &PostgresDialect,
            Backend::Duckdb => &DuckdbDialect,
            Backend::Clickhouse => &ClickhouseDialect,
        }
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
            Backend::Duckdb => "duckdb",
            Backend::Clickhouse => "clickhouse",
        }
    }

    /// Store family this backend belongs to
    pub fn family(&self) -> StoreFamily {
        self.dialect().family()
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_family() {
        assert_eq!(Backend::Sqlite.family(), StoreFamily::Row);
        assert_eq!(Backend::Postgres.family(), StoreFamily::Row);
        assert_eq!(Backend::Duckdb.family(), StoreFamily::Column);
        assert_eq!(Backend::Clickhouse.family(), StoreFamily::Column);
    }

    #[test]
    fn test_backend_name_matches_dialect() {
        for backend in [
            Backend::Sqlite,
            Backend::Postgres,
            Backend::Duckdb,
            Backend::Clickhouse,
        ] {
            assert_eq!(backend.name(), backend.dialect().name());
            assert_eq!(backend.to_string(), backend.name());
        }
    }
}
