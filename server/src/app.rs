//! Core application

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::CommandFactory;

use crate::core::cli::{self, Cli, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::data::filters::{
    CompiledQuery, FilterNode, LogicalTable, SqlCompiler, TenantId, parse_request_body, scope,
    time_filter_to_node,
};
use crate::data::sql::Backend;
use crate::data::{ColumnStoreService, RowStoreService};
use crate::domain::metrics::{MetricKind, MetricsService};
use crate::domain::pricing::PricingTable;

pub struct CoreApp {
    pub config: AppConfig,
    pub rows: Arc<RowStoreService>,
    pub columns: Arc<ColumnStoreService>,
    pub pricing: Arc<PricingTable>,
    pub metrics: MetricsService,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Metrics { metric, org, body }) => {
                let app = Self::init(&cli_config).await?;
                let result = app.run_metric(metric, &org, &body).await;
                app.shutdown().await;
                result
            }
            Some(Commands::Price {
                model,
                prompt_tokens,
                completion_tokens,
            }) => {
                let config = AppConfig::load(&cli_config)?;
                let pricing = load_pricing(config.pricing.rules_path.as_deref()).await?;
                print_price(&pricing, &model, prompt_tokens, completion_tokens)
            }
            Some(Commands::Compile {
                org,
                backend,
                table,
                body,
            }) => {
                let body = read_body(&body).await?;
                let query = compile_where(&body, &org, backend, table)?;
                print_json(&query)
            }
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let (rows, columns) = tokio::try_join!(
            async {
                RowStoreService::init(&config.database)
                    .await
                    .context("Failed to initialize row store")
            },
            async {
                ColumnStoreService::init(&config.database)
                    .await
                    .context("Failed to initialize column store")
            },
        )?;
        let rows = Arc::new(rows);
        let columns = Arc::new(columns);
        let pricing = Arc::new(load_pricing(config.pricing.rules_path.as_deref()).await?);

        tracing::debug!(
            row_store = %rows.backend(),
            column_store = %columns.backend(),
            pricing_rules = pricing.rules().len(),
            "Stores initialized"
        );

        let metrics = MetricsService::new(rows.clone(), columns.clone(), pricing.clone());
        Ok(Self {
            config,
            rows,
            columns,
            pricing,
            metrics,
        })
    }

    async fn run_metric(&self, metric: MetricKind, org: &str, body: &str) -> Result<()> {
        let json = read_body(body).await?;
        let outcome = match TenantId::new(org) {
            Ok(tenant) => match parse_request_body(&json) {
                Ok(body) => self.metrics.run(metric, &body, &tenant).await,
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(value) => print_json(&serde_json::json!({
                "metric": metric.name(),
                "value": value,
            })),
            Err(e) => anyhow::bail!("{:?}: {}", e.kind(), e.public_message()),
        }
    }

    /// Close store connections
    pub async fn shutdown(&self) {
        self.rows.close().await;
        if let Err(e) = self.columns.close().await {
            tracing::warn!(error = %e, "Failed to close column store");
        }
        tracing::debug!(
            row_store = %self.config.database.row_store,
            column_store = %self.config.database.column_store,
            "Stores closed"
        );
    }

    /// Initialize logging with env filter
    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}

/// Load pricing rules from `path`, or the built-in list
async fn load_pricing(path: Option<&Path>) -> Result<PricingTable> {
    let table = match path {
        Some(path) => PricingTable::load(path)
            .await
            .with_context(|| format!("Failed to load pricing rules: {}", path.display()))?,
        None => PricingTable::builtin().context("Built-in pricing rules are invalid")?,
    };
    Ok(table)
}

/// Inline JSON, or `@path` to read the body from a file
async fn read_body(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read request body: {}", path)),
        None => Ok(arg.to_string()),
    }
}

/// Scoped WHERE clause for `table`, time range AND filter
fn compile_where(
    json: &str,
    org: &str,
    backend: Backend,
    table: LogicalTable,
) -> Result<CompiledQuery> {
    let tenant = TenantId::new(org)?;
    let body = parse_request_body(json)?;
    let filter = FilterNode::and(time_filter_to_node(&body.time_filter, table), body.filter);
    let scoped = scope(filter, &tenant, table);
    Ok(SqlCompiler::new(backend).compile(&scoped)?)
}

fn print_price(
    pricing: &PricingTable,
    model: &str,
    prompt_tokens: i64,
    completion_tokens: i64,
) -> Result<()> {
    let resolved = pricing.resolve(model);
    print_json(&serde_json::json!({
        "model": model,
        "pricing": resolved,
        "cost": resolved.facts.cost(prompt_tokens, completion_tokens),
    }))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
