//! Database schema initialization

use duckdb::Connection;

use super::in_transaction;
use super::schema::{SCHEMA, SCHEMA_VERSION};
use crate::data::error::DataError;

/// Initialize the schema or check the recorded version
pub fn run_migrations(conn: &Connection) -> Result<(), DataError> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        tracing::debug!(
            "Initializing database with schema version {}",
            SCHEMA_VERSION
        );
        return apply_initial_schema(conn);
    }

    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM schema_version WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version > SCHEMA_VERSION {
        return Err(DataError::schema_failed(
            "duckdb",
            format!(
                "database schema version {} is newer than supported version {}",
                current_version, SCHEMA_VERSION
            ),
        ));
    }

    tracing::debug!(
        "Database schema is up to date (version {})",
        current_version
    );
    Ok(())
}

fn apply_initial_schema(conn: &Connection) -> Result<(), DataError> {
    let start = std::time::Instant::now();

    in_transaction(conn, |conn| {
        conn.execute_batch(SCHEMA)
            .map_err(|e| DataError::schema_failed("duckdb", e))?;
        conn.execute(
            "INSERT INTO schema_version (id, version, applied_at) VALUES (1, ?, current_timestamp)",
            duckdb::params![SCHEMA_VERSION],
        )?;

        tracing::debug!(
            "Applied initial schema in {}ms",
            start.elapsed().as_millis()
        );
        Ok(())
    })
}
