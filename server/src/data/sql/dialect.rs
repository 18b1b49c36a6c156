//! SQL dialect trait for multi-database support
//!
//! This trait defines the interface for generating database-specific SQL syntax
//! and for encoding bound values the way each engine expects them.

use chrono::{DateTime, Utc};

use super::StoreFamily;
use crate::data::filters::Scalar;

/// SQL dialect trait for generating database-specific SQL
///
/// Different databases have different syntax for:
/// - Parameter placeholders (? vs $1)
/// - Timestamp encoding (native timestamp vs microseconds)
/// - Substring and prefix tests
/// - Type casting
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Store family whose field registry this dialect compiles against
    fn family(&self) -> StoreFamily;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite/DuckDB: Always returns "?"
    /// - PostgreSQL: Returns "$1", "$2", etc.
    /// - ClickHouse: Returns "?"
    fn placeholder(&self, index: usize) -> String;

    /// Encode a timestamp into the value bound for it
    ///
    /// Defaults to microseconds since epoch. PostgreSQL binds TIMESTAMPTZ.
    fn encode_timestamp(&self, ts: DateTime<Utc>) -> Scalar {
        Scalar::Int(ts.timestamp_micros())
    }

    /// Wrap a timestamp placeholder so it compares against the stored column
    ///
    /// - SQLite/PostgreSQL: the placeholder itself
    /// - DuckDB: `make_timestamp(?)`
    /// - ClickHouse: `fromUnixTimestamp64Micro(toInt64(?))`
    fn timestamp_param(&self, placeholder: &str) -> String {
        placeholder.to_string()
    }

    /// Encode a boolean into the value bound for it
    fn encode_bool(&self, value: bool) -> Scalar {
        Scalar::Bool(value)
    }

    /// Case-sensitive substring test
    ///
    /// - PostgreSQL/DuckDB: `strpos(col, $1) > 0`
    /// - SQLite: `instr(col, ?) > 0`
    /// - ClickHouse: `position(col, ?) > 0`
    fn contains(&self, col: &str, placeholder: &str) -> String;

    /// Case-sensitive prefix test
    ///
    /// - PostgreSQL/DuckDB: `starts_with(col, $1)`
    /// - SQLite: `instr(col, ?) = 1`
    /// - ClickHouse: `startsWith(col, ?)`
    fn starts_with(&self, col: &str, placeholder: &str) -> String;

    /// Cast an expression to a double precision float
    ///
    /// - PostgreSQL: `(expr)::DOUBLE PRECISION`
    /// - SQLite: `CAST(expr AS REAL)`
    /// - DuckDB: `CAST(expr AS DOUBLE)`
    /// - ClickHouse: `toFloat64(expr)`
    fn cast_to_float(&self, expr: &str) -> String;

    /// Clamp a nullable integer expression to zero or above
    ///
    /// - SQLite: `max(coalesce(expr, 0), 0)`
    /// - Others: `greatest(coalesce(expr, 0), 0)`
    fn non_negative(&self, expr: &str) -> String {
        format!("greatest(coalesce({}, 0), 0)", expr)
    }
}
