//! `QueryExecutor` for the PostgreSQL row store

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Postgres, Row};

use super::PostgresService;
use crate::data::error::ExecError;
use crate::data::exec::{
    ColumnKind, ColumnSpec, QueryExecutor, StoreRow, check_backend, require_value,
    sqlx_column_error,
};
use crate::data::filters::{CompiledQuery, Scalar};
use crate::data::sql::Backend;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

#[async_trait]
impl QueryExecutor for Arc<PostgresService> {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn fetch(
        &self,
        query: &CompiledQuery,
        columns: &[ColumnSpec],
    ) -> Result<Vec<StoreRow>, ExecError> {
        check_backend(Backend::Postgres, query)?;

        let mut statement = sqlx::query(query.text());
        for arg in query.args() {
            statement = bind_scalar(statement, arg)?;
        }

        let timeout = self.query_timeout();
        let rows = tokio::time::timeout(timeout, statement.fetch_all(self.pool()))
            .await
            .map_err(|_| {
                tracing::warn!("PostgreSQL query timed out after {}s", timeout.as_secs());
                ExecError::Timeout {
                    backend: Backend::Postgres,
                    timeout_secs: timeout.as_secs(),
                }
            })?
            .map_err(|e| ExecError::from_sqlx(Backend::Postgres, e))?;

        tracing::trace!(rows = rows.len(), "PostgreSQL query completed");
        rows.iter().map(|row| decode_row(row, columns)).collect()
    }
}

fn bind_scalar<'q>(statement: PgQuery<'q>, value: &Scalar) -> Result<PgQuery<'q>, ExecError> {
    Ok(match value {
        Scalar::Null => statement.bind(None::<String>),
        Scalar::Bool(b) => statement.bind(*b),
        Scalar::Int(i) => statement.bind(*i),
        Scalar::Float(f) => statement.bind(*f),
        Scalar::Text(s) => statement.bind(s.clone()),
        Scalar::Timestamp(ts) => statement.bind(*ts),
        Scalar::List(_) => {
            return Err(ExecError::Store {
                backend: Backend::Postgres,
                message: "list arguments cannot be bound directly".to_string(),
                retryable: false,
            });
        }
    })
}

fn decode_row(row: &PgRow, columns: &[ColumnSpec]) -> Result<StoreRow, ExecError> {
    let mut decoded = StoreRow::new();
    for spec in columns {
        let value = decode_column(row, spec)
            .map_err(|e| sqlx_column_error(Backend::Postgres, spec, e))?;
        decoded.insert(spec.name.to_string(), require_value(spec, value)?);
    }
    Ok(decoded)
}

fn decode_column(row: &PgRow, spec: &ColumnSpec) -> Result<Value, sqlx::Error> {
    let name = spec.name;
    Ok(match spec.kind {
        // INTEGER columns decode as i32, aggregates as i64
        ColumnKind::Int => match row.try_get::<Option<i64>, _>(name) {
            Err(sqlx::Error::ColumnDecode { .. }) => {
                Value::from(row.try_get::<Option<i32>, _>(name)?.map(i64::from))
            }
            other => Value::from(other?),
        },
        ColumnKind::Float => Value::from(row.try_get::<Option<f64>, _>(name)?),
        ColumnKind::Text => Value::from(row.try_get::<Option<String>, _>(name)?),
        ColumnKind::Bool => Value::from(row.try_get::<Option<bool>, _>(name)?),
    })
}
