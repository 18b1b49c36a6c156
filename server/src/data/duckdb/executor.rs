//! `QueryExecutor` for the DuckDB column store

use std::sync::Arc;

use async_trait::async_trait;
use duckdb::types::Value as DuckValue;
use duckdb::{Connection, Row};
use serde_json::Value;

use super::DuckdbService;
use crate::data::error::{DecodeError, ExecError};
use crate::data::exec::{
    ColumnKind, ColumnSpec, QueryExecutor, StoreRow, check_backend, require_value,
};
use crate::data::filters::{CompiledQuery, Scalar};
use crate::data::sql::Backend;

#[async_trait]
impl QueryExecutor for Arc<DuckdbService> {
    fn backend(&self) -> Backend {
        Backend::Duckdb
    }

    async fn fetch(
        &self,
        query: &CompiledQuery,
        columns: &[ColumnSpec],
    ) -> Result<Vec<StoreRow>, ExecError> {
        check_backend(Backend::Duckdb, query)?;

        let text = query.text().to_string();
        let args = query
            .args()
            .iter()
            .map(to_duck_value)
            .collect::<Result<Vec<_>, _>>()?;
        let columns = columns.to_vec();

        let rows = self
            .run_query(move |db| db.with_conn(|conn| fetch_rows(conn, &text, &args, &columns)))
            .await?;
        tracing::trace!(rows = rows.len(), "DuckDB query completed");
        Ok(rows)
    }
}

fn to_duck_value(value: &Scalar) -> Result<DuckValue, ExecError> {
    Ok(match value {
        Scalar::Null => DuckValue::Null,
        Scalar::Bool(b) => DuckValue::Boolean(*b),
        Scalar::Int(i) => DuckValue::BigInt(*i),
        Scalar::Float(f) => DuckValue::Double(*f),
        Scalar::Text(s) => DuckValue::Text(s.clone()),
        // Timestamp placeholders are wrapped in make_timestamp(?)
        Scalar::Timestamp(ts) => DuckValue::BigInt(ts.timestamp_micros()),
        Scalar::List(_) => {
            return Err(ExecError::Store {
                backend: Backend::Duckdb,
                message: "list arguments cannot be bound directly".to_string(),
                retryable: false,
            });
        }
    })
}

fn fetch_rows(
    conn: &Connection,
    text: &str,
    args: &[DuckValue],
    columns: &[ColumnSpec],
) -> Result<Vec<StoreRow>, ExecError> {
    let mut stmt = conn.prepare(text).map_err(ExecError::from_duckdb)?;
    let mut rows = stmt
        .query(duckdb::params_from_iter(args.iter()))
        .map_err(ExecError::from_duckdb)?;

    let mut decoded = Vec::new();
    while let Some(row) = rows.next().map_err(ExecError::from_duckdb)? {
        decoded.push(decode_row(row, columns)?);
    }
    Ok(decoded)
}

fn decode_row(row: &Row<'_>, columns: &[ColumnSpec]) -> Result<StoreRow, ExecError> {
    let mut decoded = StoreRow::new();
    for spec in columns {
        let value = decode_column(row, spec).map_err(|e| column_error(spec, e))?;
        decoded.insert(spec.name.to_string(), require_value(spec, value)?);
    }
    Ok(decoded)
}

fn decode_column(row: &Row<'_>, spec: &ColumnSpec) -> Result<Value, duckdb::Error> {
    let name = spec.name;
    Ok(match spec.kind {
        ColumnKind::Int => Value::from(row.get::<_, Option<i64>>(name)?),
        ColumnKind::Float => match row.get::<_, Option<f64>>(name) {
            Err(duckdb::Error::InvalidColumnType(..)) => {
                Value::from(row.get::<_, Option<i64>>(name)?.map(|v| v as f64))
            }
            other => Value::from(other?),
        },
        ColumnKind::Text => Value::from(row.get::<_, Option<String>>(name)?),
        ColumnKind::Bool => Value::from(row.get::<_, Option<bool>>(name)?),
    })
}

fn column_error(spec: &ColumnSpec, e: duckdb::Error) -> ExecError {
    match e {
        duckdb::Error::InvalidColumnName(column) => DecodeError::MissingColumn { column }.into(),
        duckdb::Error::InvalidColumnType(_, column, actual) => DecodeError::WrongType {
            column,
            expected: spec.kind.name(),
            actual: format!("{:?}", actual),
        }
        .into(),
        e => ExecError::from_duckdb(e),
    }
}
