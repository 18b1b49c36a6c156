//! `QueryExecutor` for the SQLite row store

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};

use super::SqliteService;
use crate::data::error::ExecError;
use crate::data::exec::{
    ColumnKind, ColumnSpec, QueryExecutor, StoreRow, check_backend, require_value,
    sqlx_column_error,
};
use crate::data::filters::{CompiledQuery, Scalar};
use crate::data::sql::Backend;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

#[async_trait]
impl QueryExecutor for Arc<SqliteService> {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn fetch(
        &self,
        query: &CompiledQuery,
        columns: &[ColumnSpec],
    ) -> Result<Vec<StoreRow>, ExecError> {
        check_backend(Backend::Sqlite, query)?;

        let mut statement = sqlx::query(query.text());
        for arg in query.args() {
            statement = bind_scalar(statement, arg)?;
        }

        let timeout = self.query_timeout();
        let rows = tokio::time::timeout(timeout, statement.fetch_all(self.pool()))
            .await
            .map_err(|_| {
                tracing::warn!("SQLite query timed out after {}s", timeout.as_secs());
                ExecError::Timeout {
                    backend: Backend::Sqlite,
                    timeout_secs: timeout.as_secs(),
                }
            })?
            .map_err(|e| ExecError::from_sqlx(Backend::Sqlite, e))?;

        tracing::trace!(rows = rows.len(), "SQLite query completed");
        rows.iter().map(|row| decode_row(row, columns)).collect()
    }
}

fn bind_scalar<'q>(statement: SqliteQuery<'q>, value: &Scalar) -> Result<SqliteQuery<'q>, ExecError> {
    Ok(match value {
        Scalar::Null => statement.bind(None::<String>),
        Scalar::Bool(b) => statement.bind(*b),
        Scalar::Int(i) => statement.bind(*i),
        Scalar::Float(f) => statement.bind(*f),
        Scalar::Text(s) => statement.bind(s.clone()),
        Scalar::Timestamp(ts) => statement.bind(ts.timestamp_micros()),
        Scalar::List(_) => {
            return Err(ExecError::Store {
                backend: Backend::Sqlite,
                message: "list arguments cannot be bound directly".to_string(),
                retryable: false,
            });
        }
    })
}

fn decode_row(row: &SqliteRow, columns: &[ColumnSpec]) -> Result<StoreRow, ExecError> {
    let mut decoded = StoreRow::new();
    for spec in columns {
        let value = decode_column(row, spec)
            .map_err(|e| sqlx_column_error(Backend::Sqlite, spec, e))?;
        decoded.insert(spec.name.to_string(), require_value(spec, value)?);
    }
    Ok(decoded)
}

fn decode_column(row: &SqliteRow, spec: &ColumnSpec) -> Result<Value, sqlx::Error> {
    let name = spec.name;
    Ok(match spec.kind {
        ColumnKind::Int => Value::from(row.try_get::<Option<i64>, _>(name)?),
        // Aggregates over INTEGER columns come back as INTEGER
        ColumnKind::Float => match row.try_get::<Option<f64>, _>(name) {
            Err(sqlx::Error::ColumnDecode { .. }) => {
                Value::from(row.try_get::<Option<i64>, _>(name)?.map(|v| v as f64))
            }
            other => Value::from(other?),
        },
        ColumnKind::Text => Value::from(row.try_get::<Option<String>, _>(name)?),
        ColumnKind::Bool => Value::from(row.try_get::<Option<bool>, _>(name)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    use crate::data::error::DecodeError;
    use crate::data::exec::{RowShape, execute};
    use crate::data::filters::{
        FilterNode, LogicalTable, SqlCompiler, SqlParams, TenantId, parse_request_body, scope,
        time_filter_to_node,
    };
    use crate::data::fixtures;

    #[derive(Debug, Deserialize)]
    struct CountRow {
        count: i64,
    }

    impl RowShape for CountRow {
        const COLUMNS: &'static [ColumnSpec] = &[ColumnSpec::new("count", ColumnKind::Int)];
    }

    async fn seeded() -> Arc<SqliteService> {
        let service = SqliteService::in_memory().await.unwrap();
        fixtures::seed_sqlite(service.pool()).await.unwrap();
        Arc::new(service)
    }

    fn count_query(tenant: &str, body: &str) -> CompiledQuery {
        let body = parse_request_body(body).unwrap();
        let table = LogicalTable::RequestResponseLog;
        let filter = FilterNode::and(time_filter_to_node(&body.time_filter, table), body.filter);
        let scoped = scope(filter, &TenantId::new(tenant).unwrap(), table);

        SqlCompiler::new(Backend::Sqlite)
            .select(&scoped, |_| Ok("count(*) AS count".to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_scenario_counts_matching_rows() {
        let service = seeded().await;
        let query = count_query(fixtures::TENANT, fixtures::SCENARIO_BODY);
        assert_eq!(query.args().len(), 4);

        let rows: Vec<CountRow> = execute(&service, &query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 2);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let service = seeded().await;

        let own = execute::<CountRow>(&service, &count_query(fixtures::TENANT, fixtures::JANUARY_BODY))
            .await
            .unwrap();
        let other = execute::<CountRow>(
            &service,
            &count_query(fixtures::OTHER_TENANT, fixtures::JANUARY_BODY),
        )
        .await
        .unwrap();
        assert_eq!(own[0].count, 3);
        assert_eq!(other[0].count, 1);

        let nobody = execute::<CountRow>(&service, &count_query("org_3", fixtures::JANUARY_BODY))
            .await
            .unwrap();
        assert_eq!(nobody[0].count, 0);
    }

    #[tokio::test]
    async fn test_scoped_select_reads_only_tenant_rows() {
        let service = seeded().await;
        let count = |tenant: &str| {
            let scoped = scope(
                FilterNode::All,
                &TenantId::new(tenant).unwrap(),
                LogicalTable::Request,
            );
            SqlCompiler::new(Backend::Sqlite)
                .select(&scoped, |_| Ok("count(*) AS count".to_string()))
                .unwrap()
        };

        let own = execute::<CountRow>(&service, &count(fixtures::TENANT)).await.unwrap();
        let other = execute::<CountRow>(&service, &count(fixtures::OTHER_TENANT))
            .await
            .unwrap();
        assert_eq!(own[0].count, 4);
        assert_eq!(other[0].count, 1);
    }

    #[tokio::test]
    async fn test_all_conjunct_matches_filter_alone() {
        let service = seeded().await;
        let body = parse_request_body(fixtures::SCENARIO_BODY).unwrap();
        let table = LogicalTable::RequestResponseLog;
        let tenant = TenantId::new(fixtures::TENANT).unwrap();
        let filter = FilterNode::and(time_filter_to_node(&body.time_filter, table), body.filter);
        let compile = |node: FilterNode| {
            SqlCompiler::new(Backend::Sqlite)
                .select(&scope(node, &tenant, table), |_| {
                    Ok("count(*) AS count".to_string())
                })
                .unwrap()
        };

        let alone = compile(filter.clone());
        let all_left = compile(FilterNode::and(FilterNode::All, filter.clone()));
        let all_right = compile(FilterNode::and(filter, FilterNode::All));
        assert_eq!(all_left.args(), alone.args());
        assert_eq!(all_right.args(), alone.args());

        for query in [&alone, &all_left, &all_right] {
            let rows = execute::<CountRow>(&service, query).await.unwrap();
            assert_eq!(rows[0].count, 2);
        }
    }

    #[tokio::test]
    async fn test_metacharacters_stay_in_arguments() {
        let service = seeded().await;
        let body = r#"{
            "filter": {"leaf": {"table": "request", "column": "model", "operator": "equals", "value": "x' OR '1'='1"}},
            "timeFilter": {"start": 0, "end": 4102444800000}
        }"#;
        let query = count_query(fixtures::TENANT, body);
        assert!(!query.text().contains("OR '1'"));

        let rows = execute::<CountRow>(&service, &query).await.unwrap();
        assert_eq!(rows[0].count, 0);
    }

    #[tokio::test]
    async fn test_missing_column_is_decode_error() {
        let service = seeded().await;
        let query = SqlParams::new(Backend::Sqlite).finish_raw("SELECT 1 AS total".to_string());
        let err = execute::<CountRow>(&service, &query).await.unwrap_err();
        assert!(matches!(
            err,
            ExecError::Decode(DecodeError::MissingColumn { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_type_is_decode_error() {
        let service = seeded().await;
        let query = SqlParams::new(Backend::Sqlite).finish_raw("SELECT 'many' AS count".to_string());
        let err = execute::<CountRow>(&service, &query).await.unwrap_err();
        assert!(matches!(err, ExecError::Decode(DecodeError::WrongType { .. })));
    }

    #[tokio::test]
    async fn test_float_column_accepts_integer_values() {
        let service = seeded().await;
        let query = SqlParams::new(Backend::Sqlite).finish_raw("SELECT 3 AS total".to_string());
        let columns = [ColumnSpec::new("total", ColumnKind::Float)];
        let rows = service.fetch(&query, &columns).await.unwrap();
        assert_eq!(rows[0]["total"], serde_json::json!(3.0));
    }

    #[tokio::test]
    async fn test_rejects_query_for_other_backend() {
        let service = seeded().await;
        let query = SqlParams::new(Backend::Postgres).finish_raw("SELECT 1 AS count".to_string());
        let err = execute::<CountRow>(&service, &query).await.unwrap_err();
        assert!(matches!(err, ExecError::DialectMismatch { .. }));
    }
}
