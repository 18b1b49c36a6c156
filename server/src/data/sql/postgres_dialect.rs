//! PostgreSQL SQL dialect implementation

use chrono::{DateTime, Utc};

use super::{SqlDialect, StoreFamily};
use crate::data::filters::Scalar;

/// PostgreSQL SQL dialect
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn family(&self) -> StoreFamily {
        StoreFamily::Row
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn encode_timestamp(&self, ts: DateTime<Utc>) -> Scalar {
        // Column is TIMESTAMPTZ, bound natively
        Scalar::Timestamp(ts)
    }

    fn contains(&self, col: &str, placeholder: &str) -> String {
        format!("strpos({}, {}) > 0", col, placeholder)
    }

    fn starts_with(&self, col: &str, placeholder: &str) -> String {
        format!("starts_with({}, {})", col, placeholder)
    }

    fn cast_to_float(&self, expr: &str) -> String {
        format!("({})::DOUBLE PRECISION", expr)
    }
}
