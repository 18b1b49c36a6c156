//! Dashboard metrics over the request logs
//!
//! Every metric runs the same pipeline: time range leaf AND user filter,
//! tenant scoping, compilation for the executor's backend, execution and
//! typed decoding of a single aggregate row.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::error::ExecError;
use crate::data::exec::{ColumnKind, ColumnSpec, QueryExecutor, RowShape, execute};
use crate::data::filters::{
    CompiledQuery, FilterError, FilterNode, LogicalColumn, LogicalTable, RequestBody, SqlCompiler,
    SqlParams, TenantId, scope, time_filter_to_node,
};
use crate::data::sql::SqlDialect;
use crate::data::{ColumnStoreService, RowStoreService};
use crate::domain::pricing::PricingTable;

// ============================================================================
// ERRORS
// ============================================================================

/// Closed set of failure categories exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or unsupported filter, missing or inverted time range
    BadRequest,
    /// Missing tenant
    Unauthorized,
    /// Store not reachable or transient store failure
    StoreUnavailable,
    /// Query exceeded the configured timeout
    Timeout,
    /// Store rejected the query or returned an unexpected shape
    Internal,
}

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("Metric query returned {0} rows, expected exactly one")]
    UnexpectedRows(usize),
}

impl MetricsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Filter(FilterError::InvalidTenant) => ErrorKind::Unauthorized,
            Self::Filter(_) => ErrorKind::BadRequest,
            Self::Exec(ExecError::Timeout { .. }) => ErrorKind::Timeout,
            Self::Exec(e @ (ExecError::Unavailable { .. } | ExecError::Store { .. }))
                if e.is_retryable() =>
            {
                ErrorKind::StoreUnavailable
            }
            Self::Exec(_) | Self::UnexpectedRows(_) => ErrorKind::Internal,
        }
    }

    /// Message safe for untrusted clients
    ///
    /// Filter errors describe the caller's own input and are returned as is.
    /// Store messages stay in the logs.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::BadRequest => self.to_string(),
            ErrorKind::Unauthorized => "Unauthorized".to_string(),
            ErrorKind::StoreUnavailable => "Store unavailable, retry later".to_string(),
            ErrorKind::Timeout => "Query timed out".to_string(),
            ErrorKind::Internal => "Internal error".to_string(),
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    TotalRequests,
    ActiveUsers,
    AverageLatency,
    TotalCost,
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::TotalRequests => "total_requests",
            MetricKind::ActiveUsers => "active_users",
            MetricKind::AverageLatency => "average_latency",
            MetricKind::TotalCost => "total_cost",
        }
    }

    /// Logical table the metric aggregates over
    pub fn table(&self) -> LogicalTable {
        match self {
            MetricKind::AverageLatency => LogicalTable::PropertyWithResponse,
            _ => LogicalTable::RequestResponseLog,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(i64),
    Amount(f64),
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: i64,
}

impl RowShape for CountRow {
    const COLUMNS: &'static [ColumnSpec] = &[ColumnSpec::new("count", ColumnKind::Int)];
}

#[derive(Debug, Deserialize)]
struct UsersRow {
    users: i64,
}

impl RowShape for UsersRow {
    const COLUMNS: &'static [ColumnSpec] = &[ColumnSpec::new("users", ColumnKind::Int)];
}

#[derive(Debug, Deserialize)]
struct LatencyRow {
    average_latency: f64,
}

impl RowShape for LatencyRow {
    const COLUMNS: &'static [ColumnSpec] =
        &[ColumnSpec::new("average_latency", ColumnKind::Float)];
}

#[derive(Debug, Deserialize)]
struct CostRow {
    total_cost: f64,
}

impl RowShape for CostRow {
    const COLUMNS: &'static [ColumnSpec] = &[ColumnSpec::new("total_cost", ColumnKind::Float)];
}

/// Physical column expressions of the metric's table, resolved per family
struct Columns<'a> {
    compiler: &'a SqlCompiler,
    table: LogicalTable,
}

impl Columns<'_> {
    fn get(&self, column: LogicalColumn) -> Result<&'static str, FilterError> {
        Ok(self.compiler.registry().resolve(self.table, column)?.identifier)
    }
}

/// Build the tenant-scoped `SELECT <select>` for `metric` over its table
fn metric_query<F>(
    executor: &dyn QueryExecutor,
    metric: MetricKind,
    body: &RequestBody,
    tenant: &TenantId,
    select: F,
) -> Result<CompiledQuery, FilterError>
where
    F: FnOnce(&mut SqlParams, &dyn SqlDialect, &Columns<'_>) -> Result<String, FilterError>,
{
    let backend = executor.backend();
    let table = metric.table();
    let compiler = SqlCompiler::new(backend);

    let filter = FilterNode::and(time_filter_to_node(&body.time_filter, table), body.filter.clone());
    let scoped = scope(filter, tenant, table);

    let columns = Columns {
        compiler: &compiler,
        table,
    };
    let query = compiler.select(&scoped, |params| {
        select(params, backend.dialect(), &columns)
    })?;
    tracing::debug!(
        metric = metric.name(),
        backend = %backend,
        args = query.args().len(),
        "Built metric query"
    );
    Ok(query)
}

async fn single_row<R: RowShape>(
    executor: &dyn QueryExecutor,
    query: &CompiledQuery,
) -> Result<R, MetricsError> {
    let mut rows = execute::<R>(executor, query).await?;
    if rows.len() != 1 {
        return Err(MetricsError::UnexpectedRows(rows.len()));
    }
    Ok(rows.remove(0))
}

/// Number of requests in range
pub async fn total_requests(
    executor: &dyn QueryExecutor,
    body: &RequestBody,
    tenant: &TenantId,
) -> Result<i64, MetricsError> {
    let query = metric_query(executor, MetricKind::TotalRequests, body, tenant, |_, _, _| {
        Ok("count(*) AS count".to_string())
    })?;
    Ok(single_row::<CountRow>(executor, &query).await?.count)
}

/// Number of distinct users in range
pub async fn active_users(
    executor: &dyn QueryExecutor,
    body: &RequestBody,
    tenant: &TenantId,
) -> Result<i64, MetricsError> {
    let query = metric_query(executor, MetricKind::ActiveUsers, body, tenant, |_, _, columns| {
        Ok(format!(
            "count(DISTINCT {}) AS users",
            columns.get(LogicalColumn::UserId)?
        ))
    })?;
    Ok(single_row::<UsersRow>(executor, &query).await?.users)
}

/// Mean latency in milliseconds, 0 when nothing matches
pub async fn average_latency(
    executor: &dyn QueryExecutor,
    body: &RequestBody,
    tenant: &TenantId,
) -> Result<f64, MetricsError> {
    let query = metric_query(
        executor,
        MetricKind::AverageLatency,
        body,
        tenant,
        |_, dialect, columns| {
            let total = dialect.cast_to_float(&format!(
                "coalesce(sum({}), 0)",
                columns.get(LogicalColumn::Latency)?
            ));
            let average = format!(
                "CASE WHEN count(*) = 0 THEN 0 ELSE {} / count(*) END",
                total
            );
            Ok(format!("{} AS average_latency", dialect.cast_to_float(&average)))
        },
    )?;
    Ok(single_row::<LatencyRow>(executor, &query)
        .await?
        .average_latency)
}

/// Total spend in USD under the pricing table
pub async fn total_cost(
    executor: &dyn QueryExecutor,
    pricing: &PricingTable,
    body: &RequestBody,
    tenant: &TenantId,
) -> Result<f64, MetricsError> {
    let query = metric_query(
        executor,
        MetricKind::TotalCost,
        body,
        tenant,
        |params, dialect, columns| {
            let case = pricing.render_cost_case(
                params,
                columns.get(LogicalColumn::Model)?,
                columns.get(LogicalColumn::PromptTokens)?,
                columns.get(LogicalColumn::CompletionTokens)?,
            );
            let total = format!("coalesce(sum({}), 0)", case);
            Ok(format!("{} AS total_cost", dialect.cast_to_float(&total)))
        },
    )?;
    Ok(single_row::<CostRow>(executor, &query).await?.total_cost)
}

/// Routes each metric to the store that serves it
pub struct MetricsService {
    rows: Arc<RowStoreService>,
    columns: Arc<ColumnStoreService>,
    pricing: Arc<PricingTable>,
}

impl MetricsService {
    pub fn new(
        rows: Arc<RowStoreService>,
        columns: Arc<ColumnStoreService>,
        pricing: Arc<PricingTable>,
    ) -> Self {
        Self {
            rows,
            columns,
            pricing,
        }
    }

    pub async fn run(
        &self,
        metric: MetricKind,
        body: &RequestBody,
        tenant: &TenantId,
    ) -> Result<MetricValue, MetricsError> {
        let result = match metric {
            MetricKind::TotalRequests => total_requests(self.rows.executor(), body, tenant)
                .await
                .map(MetricValue::Count),
            MetricKind::ActiveUsers => active_users(self.columns.executor(), body, tenant)
                .await
                .map(MetricValue::Count),
            MetricKind::AverageLatency => average_latency(self.columns.executor(), body, tenant)
                .await
                .map(MetricValue::Amount),
            MetricKind::TotalCost => {
                total_cost(self.columns.executor(), &self.pricing, body, tenant)
                    .await
                    .map(MetricValue::Amount)
            }
        };

        if let Err(ref e) = result {
            tracing::warn!(
                metric = metric.name(),
                tenant = %tenant,
                kind = ?e.kind(),
                error = %e,
                "Metric query failed"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filters::parse_request_body;
    use crate::data::sql::Backend;
    use crate::data::{DuckdbService, SqliteService, fixtures};

    async fn sqlite() -> Arc<SqliteService> {
        let service = SqliteService::in_memory().await.unwrap();
        fixtures::seed_sqlite(service.pool()).await.unwrap();
        Arc::new(service)
    }

    fn duckdb() -> Arc<DuckdbService> {
        let service = DuckdbService::in_memory().unwrap();
        service
            .with_conn(|conn| fixtures::seed_duckdb(conn).map_err(ExecError::from_duckdb))
            .unwrap();
        Arc::new(service)
    }

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    const PROPERTY_BODY: &str = r#"{
        "filter": {"leaf": {"table": "property_with_response", "column": "key", "operator": "equals", "value": "environment"}},
        "timeFilter": {"start": "2024-01-01T00:00:00Z", "end": "2024-01-31T23:59:59Z"}
    }"#;

    #[tokio::test]
    async fn test_total_requests_scenario() {
        let store = sqlite().await;
        let body = parse_request_body(fixtures::SCENARIO_BODY).unwrap();
        assert_eq!(total_requests(&store, &body, &tenant(fixtures::TENANT)).await.unwrap(), 2);

        let store = duckdb();
        assert_eq!(total_requests(&store, &body, &tenant(fixtures::TENANT)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_total_requests_per_tenant() {
        let store = sqlite().await;
        let body = parse_request_body(fixtures::JANUARY_BODY).unwrap();
        assert_eq!(total_requests(&store, &body, &tenant(fixtures::TENANT)).await.unwrap(), 3);
        assert_eq!(
            total_requests(&store, &body, &tenant(fixtures::OTHER_TENANT))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_active_users() {
        let body = parse_request_body(fixtures::JANUARY_BODY).unwrap();
        let store = duckdb();
        assert_eq!(active_users(&store, &body, &tenant(fixtures::TENANT)).await.unwrap(), 2);

        let store = sqlite().await;
        assert_eq!(active_users(&store, &body, &tenant(fixtures::TENANT)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_average_latency() {
        let body = parse_request_body(PROPERTY_BODY).unwrap();
        let store = duckdb();
        let average = average_latency(&store, &body, &tenant(fixtures::TENANT))
            .await
            .unwrap();
        assert!((average - 150.0).abs() < 1e-9);

        let store = sqlite().await;
        let average = average_latency(&store, &body, &tenant(fixtures::TENANT))
            .await
            .unwrap();
        assert!((average - 150.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_average_latency_without_rows_is_zero() {
        let body = parse_request_body(PROPERTY_BODY).unwrap();
        let store = duckdb();
        let average = average_latency(&store, &body, &tenant("org_3")).await.unwrap();
        assert_eq!(average, 0.0);
    }

    #[tokio::test]
    async fn test_total_cost_scenario() {
        let pricing = PricingTable::builtin().unwrap();
        let body = parse_request_body(fixtures::SCENARIO_BODY).unwrap();
        let expected: f64 = fixtures::log_rows()
            .iter()
            .filter(|row| row.id == "req_1" || row.id == "req_2")
            .map(|row| pricing.cost_for(row.model, row.prompt_tokens, row.completion_tokens))
            .sum();
        assert!((expected - 0.18).abs() < 1e-9);

        let store = duckdb();
        let cost = total_cost(&store, &pricing, &body, &tenant(fixtures::TENANT))
            .await
            .unwrap();
        assert!((cost - expected).abs() < 1e-9);

        let store = sqlite().await;
        let cost = total_cost(&store, &pricing, &body, &tenant(fixtures::TENANT))
            .await
            .unwrap();
        assert!((cost - expected).abs() < 1e-9);

        let cost = total_cost(&store, &pricing, &body, &tenant("org_3")).await.unwrap();
        assert_eq!(cost, 0.0);
    }

    #[tokio::test]
    async fn test_total_cost_binds_case_before_filter() {
        let store = sqlite().await;
        let pricing = PricingTable::builtin().unwrap();
        let body = parse_request_body(fixtures::SCENARIO_BODY).unwrap();
        let query = metric_query(
            &store,
            MetricKind::TotalCost,
            &body,
            &tenant(fixtures::TENANT),
            |params, _, columns| {
                Ok(pricing.render_cost_case(
                    params,
                    columns.get(LogicalColumn::Model)?,
                    columns.get(LogicalColumn::PromptTokens)?,
                    columns.get(LogicalColumn::CompletionTokens)?,
                ))
            },
        )
        .unwrap();

        let rules = pricing.rules().len();
        assert_eq!(query.args().len(), rules + 4);
        assert_eq!(query.args()[0], "ada".into());
        assert_eq!(query.args()[rules], fixtures::TENANT.into());
        assert_eq!(query.args()[rules + 3], "gpt-4".into());
    }

    #[tokio::test]
    async fn test_filter_on_foreign_table_is_bad_request() {
        let store = duckdb();
        let body = parse_request_body(fixtures::SCENARIO_BODY).unwrap();
        let err = average_latency(&store, &body, &tenant(fixtures::TENANT))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MetricsError::Filter(FilterError::UnknownField { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_service_routes_metrics() {
        let rows = Arc::new(RowStoreService::Sqlite(sqlite().await));
        let columns = Arc::new(ColumnStoreService::Duckdb(duckdb()));
        let service = MetricsService::new(rows, columns, Arc::new(PricingTable::builtin().unwrap()));
        let body = parse_request_body(fixtures::SCENARIO_BODY).unwrap();
        let org = tenant(fixtures::TENANT);

        assert_eq!(
            service.run(MetricKind::TotalRequests, &body, &org).await.unwrap(),
            MetricValue::Count(2)
        );
        assert_eq!(
            service.run(MetricKind::ActiveUsers, &body, &org).await.unwrap(),
            MetricValue::Count(2)
        );
        match service.run(MetricKind::TotalCost, &body, &org).await.unwrap() {
            MetricValue::Amount(cost) => assert!((cost - 0.18).abs() < 1e-9),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            MetricsError::from(FilterError::MissingTimeFilter).kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            MetricsError::from(FilterError::InvalidTenant).kind(),
            ErrorKind::Unauthorized
        );

        let timeout = MetricsError::from(ExecError::Timeout {
            backend: Backend::Clickhouse,
            timeout_secs: 30,
        });
        assert_eq!(timeout.kind(), ErrorKind::Timeout);

        let transient = MetricsError::from(ExecError::Store {
            backend: Backend::Postgres,
            message: "connection reset by peer at 10.0.0.7".to_string(),
            retryable: true,
        });
        assert_eq!(transient.kind(), ErrorKind::StoreUnavailable);
        assert!(!transient.public_message().contains("10.0.0.7"));

        let rejected = MetricsError::from(ExecError::Store {
            backend: Backend::Postgres,
            message: "relation \"secret_table\" does not exist".to_string(),
            retryable: false,
        });
        assert_eq!(rejected.kind(), ErrorKind::Internal);
        assert_eq!(rejected.public_message(), "Internal error");

        let unavailable = MetricsError::from(ExecError::Unavailable {
            backend: Backend::Duckdb,
            reason: "connection closed".to_string(),
        });
        assert_eq!(unavailable.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(MetricsError::UnexpectedRows(0).kind(), ErrorKind::Internal);
    }
}
