//! ClickHouse column store service
//!
//! Analytics over the denormalized request log tables for distributed
//! deployments. The client talks HTTP with keep-alive, so it is cheap to
//! share and clone.

mod executor;
pub mod schema;

use std::time::Duration;

use clickhouse::Client;

use crate::core::config::ClickhouseConfig;
use crate::data::error::DataError;

/// ClickHouse column store service
pub struct ClickhouseService {
    client: Client,
    query_timeout: Duration,
}

impl ClickhouseService {
    /// Build the client and apply the schema
    pub async fn init(config: &ClickhouseConfig, query_timeout: Duration) -> Result<Self, DataError> {
        if config.url.is_empty() {
            return Err(DataError::Config("ClickHouse URL is required".into()));
        }

        let service = Self {
            client: build_client(config),
            query_timeout,
        };
        service.run_migrations().await?;

        tracing::debug!(
            url = %config.url,
            database = %config.database,
            compression = %config.compression,
            query_timeout_secs = query_timeout.as_secs(),
            "ClickhouseService initialized"
        );
        Ok(service)
    }

    /// Create a service without contacting the server (testing only)
    #[cfg(test)]
    pub fn unconnected(config: &ClickhouseConfig) -> Self {
        Self {
            client: build_client(config),
            query_timeout: Duration::from_secs(1),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Health check - verify connection to ClickHouse
    pub async fn health_check(&self) -> Result<(), DataError> {
        self.client
            .query("SELECT 1")
            .execute()
            .await
            .map_err(DataError::from)
    }

    async fn run_migrations(&self) -> Result<(), DataError> {
        let table_exists: bool = self
            .client
            .query(
                "SELECT count() > 0 FROM system.tables WHERE database = currentDatabase() AND name = 'schema_version'",
            )
            .fetch_one()
            .await?;

        let current_version: Option<i32> = if table_exists {
            self.client
                .query("SELECT version FROM schema_version FINAL WHERE id = 1")
                .fetch_optional()
                .await?
        } else {
            None
        };

        match current_version {
            None => {
                tracing::debug!(
                    "Applying initial ClickHouse schema v{}",
                    schema::SCHEMA_VERSION
                );
                self.apply_initial_schema().await
            }
            Some(v) if v > schema::SCHEMA_VERSION => Err(DataError::schema_failed(
                "clickhouse",
                format!(
                    "database schema version {} is newer than supported version {}",
                    v,
                    schema::SCHEMA_VERSION
                ),
            )),
            Some(_) => {
                tracing::debug!(
                    "ClickHouse schema is up to date (v{})",
                    schema::SCHEMA_VERSION
                );
                Ok(())
            }
        }
    }

    async fn apply_initial_schema(&self) -> Result<(), DataError> {
        for statement in schema::SCHEMA {
            self.client
                .query(statement)
                .execute()
                .await
                .map_err(|e| DataError::schema_failed("clickhouse", e))?;
        }

        self.client
            .query("INSERT INTO schema_version (id, version, applied_at) VALUES (?, ?, now64(6))")
            .bind(1u8)
            .bind(schema::SCHEMA_VERSION)
            .execute()
            .await?;

        tracing::debug!(
            version = schema::SCHEMA_VERSION,
            "ClickHouse schema applied successfully"
        );
        Ok(())
    }
}

fn build_client(config: &ClickhouseConfig) -> Client {
    let mut client = Client::default()
        .with_url(&config.url)
        .with_database(&config.database);

    if let Some(ref user) = config.user {
        client = client.with_user(user);
    }
    if let Some(ref password) = config.password {
        client = client.with_password(password);
    }
    if config.compression {
        client = client.with_compression(clickhouse::Compression::Lz4);
    }

    // Int64 as JSON numbers rather than quoted strings
    client.with_option("output_format_json_quote_64bit_integers", "0")
}
