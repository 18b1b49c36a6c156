//! PostgreSQL row store service
//!
//! Scalable deployment of the normalized request log tables:
//! - Connection pooling with min/max bounds
//! - Idle connection cleanup and lifetime cycling
//! - Server-side statement timeout on top of the client query timeout

mod executor;
mod migrations;
pub mod schema;

pub use sqlx::PgPool;

use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::log::LevelFilter;

use crate::core::config::PostgresConfig;
use crate::core::constants::{
    POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
    POSTGRES_DEFAULT_MIN_CONNECTIONS,
};
use crate::data::error::DataError;

/// PostgreSQL row store service
///
/// Should be created once at startup and shared behind an `Arc`.
pub struct PostgresService {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresService {
    /// Connect the pool and apply the schema
    pub async fn init(config: &PostgresConfig, query_timeout: Duration) -> Result<Self, DataError> {
        let url = config.url.as_str();
        if url.is_empty() {
            return Err(DataError::Config("PostgreSQL URL is required".into()));
        }

        let max_connections = non_zero_or(config.max_connections, POSTGRES_DEFAULT_MAX_CONNECTIONS);
        let min_connections = non_zero_or(config.min_connections, POSTGRES_DEFAULT_MIN_CONNECTIONS);
        let acquire_timeout = non_zero_or(
            config.acquire_timeout_secs,
            POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS,
        );
        let idle_timeout = non_zero_or(config.idle_timeout_secs, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS);
        let max_lifetime = non_zero_or(config.max_lifetime_secs, POSTGRES_DEFAULT_MAX_LIFETIME_SECS);

        let mut options: PgConnectOptions = url
            .parse()
            .map_err(|e| DataError::Config(format!("Invalid PostgreSQL URL: {}", e)))?;

        options = options.log_statements(LevelFilter::Trace);

        // 0 disables the server-side limit
        if config.statement_timeout_secs > 0 {
            options = options.options([(
                "statement_timeout",
                format!("{}s", config.statement_timeout_secs),
            )]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .max_lifetime(Duration::from_secs(max_lifetime))
            .connect_with(options)
            .await
            .map_err(DataError::from_postgres)?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(
            max_connections,
            min_connections,
            acquire_timeout_secs = acquire_timeout,
            idle_timeout_secs = idle_timeout,
            max_lifetime_secs = max_lifetime,
            statement_timeout_secs = config.statement_timeout_secs,
            query_timeout_secs = query_timeout.as_secs(),
            "PostgresService initialized"
        );
        Ok(Self {
            pool,
            query_timeout,
        })
    }

    /// Create a service whose pool connects on first use (testing only)
    #[cfg(test)]
    pub fn lazy(url: &str) -> Result<Self, DataError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(url)
            .map_err(DataError::from_postgres)?;
        Ok(Self {
            pool,
            query_timeout: Duration::from_secs(1),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("PostgreSQL pool closed");
    }
}

fn non_zero_or<T: Default + PartialEq>(value: T, default: T) -> T {
    if value == T::default() { default } else { value }
}
