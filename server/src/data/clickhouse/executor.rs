//! `QueryExecutor` for the ClickHouse column store
//!
//! Rows are fetched as `JSONEachRow` and coerced to the declared columns.

use std::sync::Arc;

use async_trait::async_trait;
use clickhouse::query::Query;

use super::ClickhouseService;
use crate::data::error::{DecodeError, ExecError};
use crate::data::exec::{ColumnSpec, QueryExecutor, StoreRow, check_backend, coerce_json};
use crate::data::filters::{CompiledQuery, Scalar};
use crate::data::sql::Backend;

#[async_trait]
impl QueryExecutor for Arc<ClickhouseService> {
    fn backend(&self) -> Backend {
        Backend::Clickhouse
    }

    async fn fetch(
        &self,
        query: &CompiledQuery,
        columns: &[ColumnSpec],
    ) -> Result<Vec<StoreRow>, ExecError> {
        check_backend(Backend::Clickhouse, query)?;

        let mut statement = self.client().query(query.text());
        for arg in query.args() {
            statement = bind_scalar(statement, arg)?;
        }

        let timeout = self.query_timeout();
        let body = tokio::time::timeout(timeout, async move {
            statement.fetch_bytes("JSONEachRow")?.collect().await
        })
        .await
        .map_err(|_| {
            tracing::warn!("ClickHouse query timed out after {}s", timeout.as_secs());
            ExecError::Timeout {
                backend: Backend::Clickhouse,
                timeout_secs: timeout.as_secs(),
            }
        })?
        .map_err(ExecError::from_clickhouse)?;

        let rows = decode_rows(&body, columns)?;
        tracing::trace!(rows = rows.len(), "ClickHouse query completed");
        Ok(rows)
    }
}

fn bind_scalar(statement: Query, value: &Scalar) -> Result<Query, ExecError> {
    Ok(match value {
        Scalar::Null => statement.bind(Option::<String>::None),
        Scalar::Bool(b) => statement.bind(*b),
        Scalar::Int(i) => statement.bind(*i),
        Scalar::Float(f) => statement.bind(*f),
        Scalar::Text(s) => statement.bind(s.as_str()),
        // Timestamp placeholders are wrapped in fromUnixTimestamp64Micro
        Scalar::Timestamp(ts) => statement.bind(ts.timestamp_micros()),
        Scalar::List(_) => {
            return Err(ExecError::Store {
                backend: Backend::Clickhouse,
                message: "list arguments cannot be bound directly".to_string(),
                retryable: false,
            });
        }
    })
}

fn decode_rows(body: &[u8], columns: &[ColumnSpec]) -> Result<Vec<StoreRow>, ExecError> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<StoreRow>()
        .map(|row| -> Result<StoreRow, ExecError> {
            let row = row.map_err(|e| DecodeError::Shape(e.to_string()))?;
            let mut decoded = StoreRow::new();
            for spec in columns {
                decoded.insert(spec.name.to_string(), coerce_json(spec, row.get(spec.name))?);
            }
            Ok(decoded)
        })
        .collect()
}
