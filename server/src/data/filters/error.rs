//! Filter compilation errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::{LogicalColumn, LogicalTable, Operator, ScalarKind};
use crate::data::sql::StoreFamily;

/// Errors raised while parsing, scoping or compiling a filter
///
/// All variants are caller errors; nothing here is retryable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Unknown field {table}.{column} for the {family} store")]
    UnknownField {
        family: StoreFamily,
        table: LogicalTable,
        column: LogicalColumn,
    },

    #[error("Type mismatch on {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Operator {operator} is not supported on {kind} field {field}")]
    UnsupportedOperator {
        field: String,
        operator: Operator,
        kind: ScalarKind,
    },

    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Missing time filter")]
    MissingTimeFilter,

    #[error("Invalid filter shape: {0}")]
    InvalidFilterShape(String),

    #[error("Invalid tenant identifier")]
    InvalidTenant,
}
