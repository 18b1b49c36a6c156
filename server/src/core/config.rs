use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, APP_NAME, CLICKHOUSE_DEFAULT_DATABASE, CONFIG_FILE_NAME,
    DEFAULT_QUERY_TIMEOUT_SECS, DUCKDB_DB_FILENAME, POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS, POSTGRES_DEFAULT_MAX_CONNECTIONS,
    POSTGRES_DEFAULT_MAX_LIFETIME_SECS, POSTGRES_DEFAULT_MIN_CONNECTIONS,
    POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS, SQLITE_DB_FILENAME,
};

// =============================================================================
// Row Store Backend Enum (SQLite or PostgreSQL)
// =============================================================================

/// Backend holding the normalized request log tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStoreBackend {
    #[default]
    Sqlite,
    Postgres,
}

impl fmt::Display for RowStoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStoreBackend::Sqlite => write!(f, "sqlite"),
            RowStoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

// =============================================================================
// Column Store Backend Enum (DuckDB or ClickHouse)
// =============================================================================

/// Backend holding the denormalized request log tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnStoreBackend {
    #[default]
    Duckdb,
    Clickhouse,
}

impl fmt::Display for ColumnStoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnStoreBackend::Duckdb => write!(f, "duckdb"),
            ColumnStoreBackend::Clickhouse => write!(f, "clickhouse"),
        }
    }
}

// =============================================================================
// File Config (JSON)
// =============================================================================

/// PostgreSQL configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostgresFileConfig {
    /// PostgreSQL connection URL (or use REQUESTLENS_POSTGRES_URL env var)
    pub url: Option<String>,
    /// Maximum number of connections in the pool (default: 20)
    pub max_connections: Option<u32>,
    /// Minimum number of connections to keep warm (default: 2)
    pub min_connections: Option<u32>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Idle connection timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Max connection lifetime in seconds (default: 1800)
    pub max_lifetime_secs: Option<u64>,
    /// Statement timeout in seconds, 0 to disable (default: 60)
    pub statement_timeout_secs: Option<u64>,
}

/// ClickHouse configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ClickhouseFileConfig {
    /// ClickHouse connection URL (or use REQUESTLENS_CLICKHOUSE_URL env var)
    pub url: Option<String>,
    /// Database name (default: "requestlens")
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Enable LZ4 compression (default: true)
    pub compression: Option<bool>,
}

/// Embedded database file section (`sqlite` / `duckdb`)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EmbeddedFileConfig {
    pub path: Option<PathBuf>,
}

/// Database configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    /// Row store backend: sqlite (default) or postgres
    pub row_store: Option<RowStoreBackend>,
    /// Column store backend: duckdb (default) or clickhouse
    pub column_store: Option<ColumnStoreBackend>,
    pub sqlite: Option<EmbeddedFileConfig>,
    pub duckdb: Option<EmbeddedFileConfig>,
    pub postgres: Option<PostgresFileConfig>,
    pub clickhouse: Option<ClickhouseFileConfig>,
    /// Per-query timeout in seconds (default: 30)
    pub query_timeout_secs: Option<u64>,
}

/// Pricing configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PricingFileConfig {
    /// JSON rule list replacing the built-in rules
    pub rules_path: Option<PathBuf>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub database: Option<DatabaseFileConfig>,
    pub pricing: Option<PricingFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Database
        if let Some(database) = other.database {
            let current = self
                .database
                .get_or_insert_with(DatabaseFileConfig::default);
            if database.row_store.is_some() {
                tracing::trace!(row_store = ?database.row_store, "Merging database.row_store");
                current.row_store = database.row_store;
            }
            if database.column_store.is_some() {
                tracing::trace!(
                    column_store = ?database.column_store,
                    "Merging database.column_store"
                );
                current.column_store = database.column_store;
            }
            if let Some(sqlite) = database.sqlite
                && sqlite.path.is_some()
            {
                tracing::trace!(path = ?sqlite.path, "Merging database.sqlite.path");
                current.sqlite = Some(sqlite);
            }
            if let Some(duckdb) = database.duckdb
                && duckdb.path.is_some()
            {
                tracing::trace!(path = ?duckdb.path, "Merging database.duckdb.path");
                current.duckdb = Some(duckdb);
            }
            if let Some(pg) = database.postgres {
                let current_pg = current
                    .postgres
                    .get_or_insert_with(PostgresFileConfig::default);
                merge_postgres(current_pg, pg);
            }
            if let Some(ch) = database.clickhouse {
                let current_ch = current
                    .clickhouse
                    .get_or_insert_with(ClickhouseFileConfig::default);
                merge_clickhouse(current_ch, ch);
            }
            if database.query_timeout_secs.is_some() {
                tracing::trace!(
                    query_timeout_secs = ?database.query_timeout_secs,
                    "Merging database.query_timeout_secs"
                );
                current.query_timeout_secs = database.query_timeout_secs;
            }
        }

        // Pricing
        if let Some(pricing) = other.pricing {
            let current = self.pricing.get_or_insert_with(PricingFileConfig::default);
            if pricing.rules_path.is_some() {
                tracing::trace!(rules_path = ?pricing.rules_path, "Merging pricing.rules_path");
                current.rules_path = pricing.rules_path;
            }
        }
    }
}

fn merge_postgres(current: &mut PostgresFileConfig, other: PostgresFileConfig) {
    if other.url.is_some() {
        tracing::trace!("Merging database.postgres.url");
        current.url = other.url;
    }
    if other.max_connections.is_some() {
        current.max_connections = other.max_connections;
    }
    if other.min_connections.is_some() {
        current.min_connections = other.min_connections;
    }
    if other.acquire_timeout_secs.is_some() {
        current.acquire_timeout_secs = other.acquire_timeout_secs;
    }
    if other.idle_timeout_secs.is_some() {
        current.idle_timeout_secs = other.idle_timeout_secs;
    }
    if other.max_lifetime_secs.is_some() {
        current.max_lifetime_secs = other.max_lifetime_secs;
    }
    if other.statement_timeout_secs.is_some() {
        current.statement_timeout_secs = other.statement_timeout_secs;
    }
}

fn merge_clickhouse(current: &mut ClickhouseFileConfig, other: ClickhouseFileConfig) {
    if other.url.is_some() {
        tracing::trace!("Merging database.clickhouse.url");
        current.url = other.url;
    }
    if other.database.is_some() {
        current.database = other.database;
    }
    if other.user.is_some() {
        current.user = other.user;
    }
    if other.password.is_some() {
        current.password = other.password;
    }
    if other.compression.is_some() {
        current.compression = other.compression;
    }
}

// =============================================================================
// Runtime Config
// =============================================================================

/// PostgreSQL pool configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    /// 0 disables the server-side statement timeout
    pub statement_timeout_secs: u64,
}

/// ClickHouse client configuration
#[derive(Debug, Clone)]
pub struct ClickhouseConfig {
    pub url: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub compression: bool,
}

/// Store selection and connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub row_store: RowStoreBackend,
    pub column_store: ColumnStoreBackend,
    pub sqlite_path: PathBuf,
    pub duckdb_path: PathBuf,
    /// Only set when the row store is PostgreSQL
    pub postgres: Option<PostgresConfig>,
    /// Only set when the column store is ClickHouse
    pub clickhouse: Option<ClickhouseConfig>,
    pub query_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PricingConfig {
    /// `None` uses the built-in rule list
    pub rules_path: Option<PathBuf>,
}

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub pricing: PricingConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.requestlens/requestlens.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(file_config, cli);
        config.validate()?;

        tracing::debug!(
            row_store = %config.database.row_store,
            column_store = %config.database.column_store,
            query_timeout_secs = config.database.query_timeout_secs,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Layer defaults, merged file config and CLI/env overrides
    fn resolve(file_config: FileConfig, cli: &CliConfig) -> Self {
        let file_database = file_config.database.unwrap_or_default();
        let file_pricing = file_config.pricing.unwrap_or_default();

        let row_store = cli
            .row_store
            .or(file_database.row_store)
            .unwrap_or_default();
        let column_store = cli
            .column_store
            .or(file_database.column_store)
            .unwrap_or_default();

        let data_dir = default_data_dir();
        let sqlite_path = cli
            .sqlite_path
            .clone()
            .or(file_database.sqlite.and_then(|s| s.path))
            .map(|p| expand_path(&p.to_string_lossy()))
            .unwrap_or_else(|| data_dir.join(SQLITE_DB_FILENAME));
        let duckdb_path = cli
            .duckdb_path
            .clone()
            .or(file_database.duckdb.and_then(|d| d.path))
            .map(|p| expand_path(&p.to_string_lossy()))
            .unwrap_or_else(|| data_dir.join(DUCKDB_DB_FILENAME));

        // PostgreSQL config (only populated if using postgres backend)
        let postgres = if row_store == RowStoreBackend::Postgres {
            let file_pg = file_database.postgres.unwrap_or_default();
            Some(PostgresConfig {
                url: cli.postgres_url.clone().or(file_pg.url).unwrap_or_default(),
                max_connections: file_pg
                    .max_connections
                    .unwrap_or(POSTGRES_DEFAULT_MAX_CONNECTIONS),
                min_connections: file_pg
                    .min_connections
                    .unwrap_or(POSTGRES_DEFAULT_MIN_CONNECTIONS),
                acquire_timeout_secs: file_pg
                    .acquire_timeout_secs
                    .unwrap_or(POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS),
                idle_timeout_secs: file_pg
                    .idle_timeout_secs
                    .unwrap_or(POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS),
                max_lifetime_secs: file_pg
                    .max_lifetime_secs
                    .unwrap_or(POSTGRES_DEFAULT_MAX_LIFETIME_SECS),
                statement_timeout_secs: file_pg
                    .statement_timeout_secs
                    .unwrap_or(POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS),
            })
        } else {
            None
        };

        // ClickHouse config (only populated if using clickhouse backend)
        let clickhouse = if column_store == ColumnStoreBackend::Clickhouse {
            let file_ch = file_database.clickhouse.unwrap_or_default();
            Some(ClickhouseConfig {
                url: cli
                    .clickhouse_url
                    .clone()
                    .or(file_ch.url)
                    .unwrap_or_default(),
                database: file_ch
                    .database
                    .unwrap_or_else(|| CLICKHOUSE_DEFAULT_DATABASE.to_string()),
                user: file_ch.user,
                password: file_ch.password,
                compression: file_ch.compression.unwrap_or(true),
            })
        } else {
            None
        };

        let query_timeout_secs = cli
            .query_timeout_secs
            .or(file_database.query_timeout_secs)
            .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS);

        let rules_path = cli
            .pricing_rules_path
            .clone()
            .or(file_pricing.rules_path)
            .map(|p| expand_path(&p.to_string_lossy()));

        Self {
            database: DatabaseConfig {
                row_store,
                column_store,
                sqlite_path,
                duckdb_path,
                postgres,
                clickhouse,
                query_timeout_secs,
            },
            pricing: PricingConfig { rules_path },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.database.query_timeout_secs == 0 {
            anyhow::bail!("Configuration error: database.query_timeout_secs must be greater than 0");
        }

        if self.database.row_store == RowStoreBackend::Postgres
            && self
                .database
                .postgres
                .as_ref()
                .is_none_or(|pg| pg.url.is_empty())
        {
            anyhow::bail!(
                "Configuration error: database.postgres.url is required when database.row_store is 'postgres'"
            );
        }

        if self.database.column_store == ColumnStoreBackend::Clickhouse
            && self
                .database
                .clickhouse
                .as_ref()
                .is_none_or(|ch| ch.url.is_empty())
        {
            anyhow::bail!(
                "Configuration error: database.clickhouse.url is required when database.column_store is 'clickhouse'"
            );
        }

        if let Some(ref path) = self.pricing.rules_path
            && !path.exists()
        {
            anyhow::bail!(
                "Configuration error: pricing.rules_path does not exist: {}",
                path.display()
            );
        }

        Ok(())
    }
}

/// Get the profile config path (~/.requestlens/requestlens.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Platform data directory, falling back to a local dot folder
fn default_data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join(APP_NAME);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    cwd.join(APP_DOT_FOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_backend_serde() {
        let backend: RowStoreBackend = serde_json::from_str(r#""postgres""#).unwrap();
        assert_eq!(backend, RowStoreBackend::Postgres);
        let backend: ColumnStoreBackend = serde_json::from_str(r#""clickhouse""#).unwrap();
        assert_eq!(backend, ColumnStoreBackend::Clickhouse);
        assert!(serde_json::from_str::<RowStoreBackend>(r#""mysql""#).is_err());
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(RowStoreBackend::Sqlite.to_string(), "sqlite");
        assert_eq!(ColumnStoreBackend::Duckdb.to_string(), "duckdb");
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "database": {
                "row_store": "postgres",
                "column_store": "clickhouse",
                "postgres": { "url": "postgres://localhost/logs", "max_connections": 4 },
                "clickhouse": { "url": "http://localhost:8123", "compression": false },
                "query_timeout_secs": 10
            },
            "pricing": { "rules_path": "/etc/requestlens/pricing.json" }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let database = config.database.as_ref().unwrap();
        assert_eq!(database.row_store, Some(RowStoreBackend::Postgres));
        assert_eq!(database.column_store, Some(ColumnStoreBackend::Clickhouse));
        assert_eq!(
            database.postgres.as_ref().unwrap().max_connections,
            Some(4)
        );
        assert_eq!(
            database.clickhouse.as_ref().unwrap().compression,
            Some(false)
        );
        assert_eq!(database.query_timeout_secs, Some(10));
        assert_eq!(
            config.pricing.as_ref().unwrap().rules_path,
            Some(PathBuf::from("/etc/requestlens/pricing.json"))
        );
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "database": { "query_timeout_secs": 5 }, "databse": {} }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert!(config.extra.get("databse").is_some());
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{ "database": { "row_store": "postgres", "postgres": { "url": "postgres://a", "max_connections": 8 } } }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{ "database": { "postgres": { "url": "postgres://b" }, "query_timeout_secs": 7 } }"#,
        )
        .unwrap();
        base.merge(overlay);

        let database = base.database.unwrap();
        assert_eq!(database.row_store, Some(RowStoreBackend::Postgres));
        let pg = database.postgres.unwrap();
        assert_eq!(pg.url.as_deref(), Some("postgres://b"));
        assert_eq!(pg.max_connections, Some(8));
        assert_eq!(database.query_timeout_secs, Some(7));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(FileConfig::default(), &CliConfig::default());
        assert_eq!(config.database.row_store, RowStoreBackend::Sqlite);
        assert_eq!(config.database.column_store, ColumnStoreBackend::Duckdb);
        assert!(config.database.sqlite_path.ends_with(SQLITE_DB_FILENAME));
        assert!(config.database.duckdb_path.ends_with(DUCKDB_DB_FILENAME));
        assert!(config.database.postgres.is_none());
        assert!(config.database.clickhouse.is_none());
        assert_eq!(
            config.database.query_timeout(),
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)
        );
        assert!(config.pricing.rules_path.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_resolve_cli_overrides_file() {
        let file: FileConfig = serde_json::from_str(
            r#"{ "database": { "row_store": "postgres", "postgres": { "url": "postgres://file" }, "query_timeout_secs": 10 } }"#,
        )
        .unwrap();
        let cli = CliConfig {
            postgres_url: Some("postgres://cli".to_string()),
            query_timeout_secs: Some(3),
            ..Default::default()
        };
        let config = AppConfig::resolve(file, &cli);
        let pg = config.database.postgres.as_ref().unwrap();
        assert_eq!(pg.url, "postgres://cli");
        assert_eq!(pg.max_connections, POSTGRES_DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.database.query_timeout_secs, 3);
    }

    #[test]
    fn test_clickhouse_defaults() {
        let cli = CliConfig {
            column_store: Some(ColumnStoreBackend::Clickhouse),
            clickhouse_url: Some("http://localhost:8123".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(FileConfig::default(), &cli);
        let ch = config.database.clickhouse.as_ref().unwrap();
        assert_eq!(ch.database, CLICKHOUSE_DEFAULT_DATABASE);
        assert!(ch.compression);
        assert!(ch.user.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_requires_remote_urls() {
        let cli = CliConfig {
            row_store: Some(RowStoreBackend::Postgres),
            ..Default::default()
        };
        let err = AppConfig::resolve(FileConfig::default(), &cli)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("database.postgres.url"));

        let cli = CliConfig {
            column_store: Some(ColumnStoreBackend::Clickhouse),
            ..Default::default()
        };
        let err = AppConfig::resolve(FileConfig::default(), &cli)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("database.clickhouse.url"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let cli = CliConfig {
            query_timeout_secs: Some(0),
            ..Default::default()
        };
        let err = AppConfig::resolve(FileConfig::default(), &cli)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("query_timeout_secs"));
    }

    #[test]
    fn test_validate_rejects_missing_rules_file() {
        let cli = CliConfig {
            pricing_rules_path: Some(PathBuf::from("/nonexistent/pricing.json")),
            ..Default::default()
        };
        let err = AppConfig::resolve(FileConfig::default(), &cli)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("pricing.rules_path"));
    }

    #[test]
    fn test_load_from_cli_config_path() {
        let file = write_config(
            r#"{ "database": { "sqlite": { "path": "/tmp/requestlens-test.db" }, "query_timeout_secs": 12 } }"#,
        );
        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(
            config.database.sqlite_path,
            PathBuf::from("/tmp/requestlens-test.db")
        );
        assert_eq!(config.database.query_timeout_secs, 12);
    }

    #[test]
    fn test_load_missing_config_path() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/requestlens.json")),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_malformed_config() {
        let file = write_config("{ not json");
        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
