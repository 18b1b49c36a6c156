//! DuckDB SQL dialect implementation

use super::{SqlDialect, StoreFamily};

/// DuckDB SQL dialect
pub struct DuckdbDialect;

impl SqlDialect for DuckdbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn family(&self) -> StoreFamily {
        StoreFamily::Column
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn timestamp_param(&self, placeholder: &str) -> String {
        format!("make_timestamp({})", placeholder)
    }

    fn contains(&self, col: &str, placeholder: &str) -> String {
        format!("strpos({}, {}) > 0", col, placeholder)
    }

    fn starts_with(&self, col: &str, placeholder: &str) -> String {
        format!("starts_with({}, {})", col, placeholder)
    }

    fn cast_to_float(&self, expr: &str) -> String {
        format!("CAST({} AS DOUBLE)", expr)
    }
}
