// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "RequestLens";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "requestlens";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".requestlens";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "requestlens.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "REQUESTLENS_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "REQUESTLENS_LOG";

// =============================================================================
// Environment Variables - Database
// =============================================================================

/// Environment variable for row store backend (sqlite or postgres)
pub const ENV_ROW_STORE: &str = "REQUESTLENS_ROW_STORE";

/// Environment variable for column store backend (duckdb or clickhouse)
pub const ENV_COLUMN_STORE: &str = "REQUESTLENS_COLUMN_STORE";

/// Environment variable for the SQLite database path
pub const ENV_SQLITE_PATH: &str = "REQUESTLENS_SQLITE_PATH";

/// Environment variable for the DuckDB database path
pub const ENV_DUCKDB_PATH: &str = "REQUESTLENS_DUCKDB_PATH";

/// Environment variable for PostgreSQL connection URL
pub const ENV_POSTGRES_URL: &str = "REQUESTLENS_POSTGRES_URL";

/// Environment variable for ClickHouse connection URL
pub const ENV_CLICKHOUSE_URL: &str = "REQUESTLENS_CLICKHOUSE_URL";

/// Environment variable for the per-query timeout
pub const ENV_QUERY_TIMEOUT_SECS: &str = "REQUESTLENS_QUERY_TIMEOUT_SECS";

// =============================================================================
// Environment Variables - Pricing & Tenancy
// =============================================================================

/// Environment variable for a pricing rule file replacing the built-in list
pub const ENV_PRICING_RULES_PATH: &str = "REQUESTLENS_PRICING_RULES_PATH";

/// Environment variable for the organization the CLI acts as
pub const ENV_ORG: &str = "REQUESTLENS_ORG";

// =============================================================================
// SQLite
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "requestlens.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -64000 = 64MB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

// =============================================================================
// DuckDB
// =============================================================================

/// DuckDB database filename
pub const DUCKDB_DB_FILENAME: &str = "requestlens.duckdb";

// =============================================================================
// Query Execution
// =============================================================================

/// Default per-query timeout in seconds, applied to every store
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// PostgreSQL
// =============================================================================

/// PostgreSQL default max connections
pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL default min connections (keep warm for low latency)
pub const POSTGRES_DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// PostgreSQL default connection acquire timeout in seconds
pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// PostgreSQL idle connection timeout in seconds
pub const POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// PostgreSQL max connection lifetime in seconds
pub const POSTGRES_DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// PostgreSQL statement timeout in seconds (0 = disabled)
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// ClickHouse
// =============================================================================

/// ClickHouse default database name
pub const CLICKHOUSE_DEFAULT_DATABASE: &str = "requestlens";
