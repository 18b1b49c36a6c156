use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::{ColumnStoreBackend, RowStoreBackend};
use super::constants::{
    ENV_CLICKHOUSE_URL, ENV_COLUMN_STORE, ENV_CONFIG, ENV_DUCKDB_PATH, ENV_ORG,
    ENV_POSTGRES_URL, ENV_PRICING_RULES_PATH, ENV_QUERY_TIMEOUT_SECS, ENV_ROW_STORE,
    ENV_SQLITE_PATH,
};
use crate::data::filters::LogicalTable;
use crate::data::sql::Backend;
use crate::domain::metrics::MetricKind;

#[derive(Parser)]
#[command(name = "requestlens")]
#[command(version, about = "LLM request log analytics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Database options
    /// Row store backend (sqlite or postgres)
    #[arg(long, global = true, env = ENV_ROW_STORE, value_parser = parse_row_store_backend)]
    pub row_store: Option<RowStoreBackend>,

    /// Column store backend (duckdb or clickhouse)
    #[arg(long, global = true, env = ENV_COLUMN_STORE, value_parser = parse_column_store_backend)]
    pub column_store: Option<ColumnStoreBackend>,

    /// SQLite database file (when using sqlite row store)
    #[arg(long, global = true, env = ENV_SQLITE_PATH)]
    pub sqlite_path: Option<PathBuf>,

    /// DuckDB database file (when using duckdb column store)
    #[arg(long, global = true, env = ENV_DUCKDB_PATH)]
    pub duckdb_path: Option<PathBuf>,

    /// PostgreSQL connection URL (when using postgres row store)
    #[arg(long, global = true, env = ENV_POSTGRES_URL)]
    pub postgres_url: Option<String>,

    /// ClickHouse connection URL (when using clickhouse column store)
    #[arg(long, global = true, env = ENV_CLICKHOUSE_URL)]
    pub clickhouse_url: Option<String>,

    /// Per-query timeout in seconds
    #[arg(long, global = true, env = ENV_QUERY_TIMEOUT_SECS)]
    pub query_timeout_secs: Option<u64>,

    /// JSON pricing rule file replacing the built-in rules
    #[arg(long, global = true, env = ENV_PRICING_RULES_PATH)]
    pub pricing_rules_path: Option<PathBuf>,
}

/// Parse row store backend from CLI/env string
fn parse_row_store_backend(s: &str) -> Result<RowStoreBackend, String> {
    match s.to_lowercase().as_str() {
        "sqlite" => Ok(RowStoreBackend::Sqlite),
        "postgres" | "postgresql" => Ok(RowStoreBackend::Postgres),
        _ => Err(format!(
            "Invalid row store backend '{}'. Valid options: sqlite, postgres",
            s
        )),
    }
}

/// Parse column store backend from CLI/env string
fn parse_column_store_backend(s: &str) -> Result<ColumnStoreBackend, String> {
    match s.to_lowercase().as_str() {
        "duckdb" => Ok(ColumnStoreBackend::Duckdb),
        "clickhouse" => Ok(ColumnStoreBackend::Clickhouse),
        _ => Err(format!(
            "Invalid column store backend '{}'. Valid options: duckdb, clickhouse",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Compute a dashboard metric for one organization
    Metrics {
        #[arg(value_enum)]
        metric: MetricKind,
        /// Organization the request is scoped to
        #[arg(long, env = ENV_ORG)]
        org: String,
        /// Request body as inline JSON, or @path to read it from a file
        #[arg(long)]
        body: String,
    },
    /// Resolve the pricing rule for a model
    Price {
        model: String,
        #[arg(long, default_value_t = 0)]
        prompt_tokens: i64,
        #[arg(long, default_value_t = 0)]
        completion_tokens: i64,
    },
    /// Print the scoped WHERE clause and its arguments without executing it
    Compile {
        #[arg(long, env = ENV_ORG)]
        org: String,
        #[arg(long, value_enum)]
        backend: Backend,
        #[arg(long, value_enum, default_value_t = LogicalTable::RequestResponseLog)]
        table: LogicalTable,
        /// Request body as inline JSON, or @path to read it from a file
        #[arg(long)]
        body: String,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub row_store: Option<RowStoreBackend>,
    pub column_store: Option<ColumnStoreBackend>,
    pub sqlite_path: Option<PathBuf>,
    pub duckdb_path: Option<PathBuf>,
    pub postgres_url: Option<String>,
    pub clickhouse_url: Option<String>,
    pub query_timeout_secs: Option<u64>,
    pub pricing_rules_path: Option<PathBuf>,
}

/// Parse CLI arguments and return config and command
pub fn parse() -> (CliConfig, Option<Commands>) {
    split(Cli::parse())
}

fn split(cli: Cli) -> (CliConfig, Option<Commands>) {
    let config = CliConfig {
        config: cli.config,
        row_store: cli.row_store,
        column_store: cli.column_store,
        sqlite_path: cli.sqlite_path,
        duckdb_path: cli.duckdb_path,
        postgres_url: cli.postgres_url,
        clickhouse_url: cli.clickhouse_url,
        query_timeout_secs: cli.query_timeout_secs,
        pricing_rules_path: cli.pricing_rules_path,
    };
    (config, cli.command)
}
