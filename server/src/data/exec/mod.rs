//! Query execution adapter
//!
//! `QueryExecutor` runs a `CompiledQuery` against one backend and decodes the
//! declared columns into JSON rows. `execute` then deserializes those rows
//! into a typed `RowShape`. Store implementations live next to each service.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::data::error::{DecodeError, ExecError};
use crate::data::filters::CompiledQuery;
use crate::data::sql::Backend;

/// Declared kind of a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    Bool,
}

impl ColumnKind {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnKind::Int => "int",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
            ColumnKind::Bool => "bool",
        }
    }
}

/// Result column a caller expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }
}

/// One decoded row, keyed by column name
pub type StoreRow = Map<String, Value>;

/// Typed result row with its declared columns
pub trait RowShape: DeserializeOwned {
    const COLUMNS: &'static [ColumnSpec];
}

/// Runs compiled queries against a store
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Backend whose dialect this executor accepts
    fn backend(&self) -> Backend;

    /// Run `query` and decode `columns` from every returned row
    async fn fetch(
        &self,
        query: &CompiledQuery,
        columns: &[ColumnSpec],
    ) -> Result<Vec<StoreRow>, ExecError>;
}

/// Run `query` and deserialize every row into `R`
pub async fn execute<R: RowShape>(
    executor: &dyn QueryExecutor,
    query: &CompiledQuery,
) -> Result<Vec<R>, ExecError> {
    let rows = executor.fetch(query, R::COLUMNS).await?;
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row))
                .map_err(|e| ExecError::Decode(DecodeError::Shape(e.to_string())))
        })
        .collect()
}

/// Reject a query compiled for another backend
pub(crate) fn check_backend(executor: Backend, query: &CompiledQuery) -> Result<(), ExecError> {
    if query.backend() != executor {
        return Err(ExecError::DialectMismatch {
            compiled: query.backend(),
            executor,
        });
    }
    Ok(())
}

/// Check nullability of a decoded value
pub(crate) fn require_value(spec: &ColumnSpec, value: Value) -> Result<Value, DecodeError> {
    if value.is_null() && !spec.nullable {
        return Err(DecodeError::UnexpectedNull {
            column: spec.name.to_string(),
        });
    }
    Ok(value)
}

/// Map a sqlx column read failure to the execution error for `spec`
pub(crate) fn sqlx_column_error(backend: Backend, spec: &ColumnSpec, e: sqlx::Error) -> ExecError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DecodeError::WrongType {
            column: spec.name.to_string(),
            expected: spec.kind.name(),
            actual: source.to_string(),
        }
        .into(),
        e => ExecError::from_sqlx(backend, e),
    }
}

/// Coerce a JSON value returned by a store into the declared kind
///
/// Stores that answer in JSON may widen or stringify numbers.
pub(crate) fn coerce_json(spec: &ColumnSpec, value: Option<&Value>) -> Result<Value, DecodeError> {
    let Some(value) = value else {
        return Err(DecodeError::MissingColumn {
            column: spec.name.to_string(),
        });
    };
    let wrong_type = || DecodeError::WrongType {
        column: spec.name.to_string(),
        expected: spec.kind.name(),
        actual: value.to_string(),
    };

    let coerced = match (spec.kind, value) {
        (_, Value::Null) => Value::Null,
        (ColumnKind::Int, Value::Number(n)) => n.as_i64().map(Value::from).ok_or_else(wrong_type)?,
        (ColumnKind::Int, Value::String(s)) => {
            s.parse::<i64>().map(Value::from).map_err(|_| wrong_type())?
        }
        (ColumnKind::Float, Value::Number(n)) => {
            n.as_f64().map(Value::from).ok_or_else(wrong_type)?
        }
        (ColumnKind::Float, Value::String(s)) => {
            s.parse::<f64>().map(Value::from).map_err(|_| wrong_type())?
        }
        (ColumnKind::Text, Value::String(s)) => Value::String(s.clone()),
        (ColumnKind::Bool, Value::Bool(b)) => Value::Bool(*b),
        (ColumnKind::Bool, Value::Number(n)) => match n.as_u64() {
            Some(0) => Value::Bool(false),
            Some(1) => Value::Bool(true),
            _ => return Err(wrong_type()),
        },
        _ => return Err(wrong_type()),
    };
    require_value(spec, coerced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct CountRow {
        count: i64,
    }

    impl RowShape for CountRow {
        const COLUMNS: &'static [ColumnSpec] = &[ColumnSpec::new("count", ColumnKind::Int)];
    }

    struct StaticExecutor {
        rows: Vec<StoreRow>,
    }

    #[async_trait]
    impl QueryExecutor for StaticExecutor {
        fn backend(&self) -> Backend {
            Backend::Sqlite
        }

        async fn fetch(
            &self,
            query: &CompiledQuery,
            _columns: &[ColumnSpec],
        ) -> Result<Vec<StoreRow>, ExecError> {
            check_backend(self.backend(), query)?;
            Ok(self.rows.clone())
        }
    }

    fn row(value: Value) -> StoreRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn query(backend: Backend) -> CompiledQuery {
        crate::data::filters::SqlParams::new(backend).finish_raw("SELECT 1".to_string())
    }

    #[tokio::test]
    async fn test_execute_decodes_rows() {
        let executor = StaticExecutor {
            rows: vec![row(json!({"count": 2}))],
        };
        let rows: Vec<CountRow> = execute(&executor, &query(Backend::Sqlite)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 2);
    }

    #[tokio::test]
    async fn test_execute_rejects_foreign_query() {
        let executor = StaticExecutor { rows: Vec::new() };
        let err = execute::<CountRow>(&executor, &query(Backend::Postgres))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::DialectMismatch { .. }));
    }

    #[tokio::test]
    async fn test_execute_shape_mismatch() {
        let executor = StaticExecutor {
            rows: vec![row(json!({"total": 2}))],
        };
        let err = execute::<CountRow>(&executor, &query(Backend::Sqlite))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Decode(DecodeError::Shape(_))));
    }

    #[test]
    fn test_coerce_json() {
        let int = ColumnSpec::new("count", ColumnKind::Int);
        assert_eq!(coerce_json(&int, Some(&json!("42"))).unwrap(), json!(42));
        assert_eq!(coerce_json(&int, Some(&json!(7))).unwrap(), json!(7));
        assert!(matches!(
            coerce_json(&int, Some(&json!("many"))),
            Err(DecodeError::WrongType { .. })
        ));
        assert!(matches!(
            coerce_json(&int, None),
            Err(DecodeError::MissingColumn { .. })
        ));
        assert!(matches!(
            coerce_json(&int, Some(&Value::Null)),
            Err(DecodeError::UnexpectedNull { .. })
        ));

        let float = ColumnSpec::new("avg", ColumnKind::Float).nullable();
        assert_eq!(coerce_json(&float, Some(&json!(3))).unwrap(), json!(3.0));
        assert_eq!(coerce_json(&float, Some(&Value::Null)).unwrap(), Value::Null);
    }
}
