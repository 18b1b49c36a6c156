//! SQLite SQL dialect implementation

use super::{SqlDialect, StoreFamily};
use crate::data::filters::Scalar;

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn family(&self) -> StoreFamily {
        StoreFamily::Row
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    // Timestamps are stored as INTEGER microseconds, the default encoding applies

    fn encode_bool(&self, value: bool) -> Scalar {
        // SQLite has no boolean storage class
        Scalar::Int(i64::from(value))
    }

    fn contains(&self, col: &str, placeholder: &str) -> String {
        // LIKE is case-insensitive for ASCII in SQLite, instr is not
        format!("instr({}, {}) > 0", col, placeholder)
    }

    fn starts_with(&self, col: &str, placeholder: &str) -> String {
        format!("instr({}, {}) = 1", col, placeholder)
    }

    fn cast_to_float(&self, expr: &str) -> String {
        format!("CAST({} AS REAL)", expr)
    }

    fn non_negative(&self, expr: &str) -> String {
        // Multi-argument max is the scalar form
        format!("max(coalesce({}, 0), 0)", expr)
    }
}
