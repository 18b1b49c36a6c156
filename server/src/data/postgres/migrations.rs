//! PostgreSQL migration management

use sqlx::PgPool;

use super::schema::{SCHEMA, SCHEMA_VERSION};
use crate::data::error::DataError;

/// Apply the schema on a fresh database and check the recorded version
pub async fn run_migrations(pool: &PgPool) -> Result<(), DataError> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_name = 'schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(DataError::from_postgres)?;

    let current_version: Option<i32> = if table_exists {
        sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_optional(pool)
            .await
            .map_err(DataError::from_postgres)?
    } else {
        None
    };

    match current_version {
        None => {
            tracing::debug!("Applying initial PostgreSQL schema v{}", SCHEMA_VERSION);
            apply_initial_schema(pool).await
        }
        Some(v) if v > SCHEMA_VERSION => Err(DataError::schema_failed(
            "postgres",
            format!(
                "database schema version {} is newer than supported version {}",
                v, SCHEMA_VERSION
            ),
        )),
        Some(_) => {
            tracing::debug!("PostgreSQL schema is up to date (v{})", SCHEMA_VERSION);
            Ok(())
        }
    }
}

async fn apply_initial_schema(pool: &PgPool) -> Result<(), DataError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| DataError::schema_failed("postgres", e))?;

    sqlx::query(
        "INSERT INTO schema_version (id, version, applied_at)
         VALUES (1, $1, now())
         ON CONFLICT (id) DO UPDATE SET version = $1, applied_at = now()",
    )
    .bind(SCHEMA_VERSION)
    .execute(pool)
    .await
    .map_err(DataError::from_postgres)?;

    tracing::debug!("PostgreSQL schema v{} applied successfully", SCHEMA_VERSION);
    Ok(())
}
