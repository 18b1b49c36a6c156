//! ClickHouse SQL dialect implementation

use super::{SqlDialect, StoreFamily};

/// ClickHouse SQL dialect
pub struct ClickhouseDialect;

impl SqlDialect for ClickhouseDialect {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn family(&self) -> StoreFamily {
        StoreFamily::Column
    }

    fn placeholder(&self, _index: usize) -> String {
        // The clickhouse crate substitutes `?` client-side via Query::bind
        "?".to_string()
    }

    fn timestamp_param(&self, placeholder: &str) -> String {
        // Bound integer literals may be inferred as UInt64
        format!("fromUnixTimestamp64Micro(toInt64({}))", placeholder)
    }

    fn contains(&self, col: &str, placeholder: &str) -> String {
        format!("position({}, {}) > 0", col, placeholder)
    }

    fn starts_with(&self, col: &str, placeholder: &str) -> String {
        format!("startsWith({}, {})", col, placeholder)
    }

    fn cast_to_float(&self, expr: &str) -> String {
        format!("toFloat64({})", expr)
    }
}
