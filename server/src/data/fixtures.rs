//! Seed data shared by store tests
//!
//! Two tenants. For `org_1` two gpt-4 requests fall inside January 2024
//! and three rows miss the January gpt-4 filter (other model, other month,
//! other tenant).

use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;

pub const TENANT: &str = "org_1";
pub const OTHER_TENANT: &str = "org_2";

/// January 2024 gpt-4 requests
pub const SCENARIO_BODY: &str = r#"{
    "filter": {"leaf": {"table": "request_response_log", "column": "model", "operator": "equals", "value": "gpt-4"}},
    "timeFilter": {"start": "2024-01-01T00:00:00Z", "end": "2024-01-31T23:59:59Z"}
}"#;

/// All of January 2024, no extra filter
pub const JANUARY_BODY: &str = r#"{
    "timeFilter": {"start": "2024-01-01T00:00:00Z", "end": "2024-01-31T23:59:59Z"}
}"#;

pub struct LogFixture {
    pub id: &'static str,
    pub organization_id: &'static str,
    pub created_at: DateTime<Utc>,
    pub model: &'static str,
    pub user_id: &'static str,
    pub path: &'static str,
    pub status: i64,
    pub latency: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub property: (&'static str, &'static str),
}

fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap()
}

pub fn log_rows() -> Vec<LogFixture> {
    vec![
        LogFixture {
            id: "req_1",
            organization_id: TENANT,
            created_at: at(1, 10),
            model: "gpt-4",
            user_id: "user_a",
            path: "/v1/chat/completions",
            status: 200,
            latency: 100,
            prompt_tokens: 1000,
            completion_tokens: 500,
            property: ("environment", "prod"),
        },
        LogFixture {
            id: "req_2",
            organization_id: TENANT,
            created_at: at(1, 20),
            model: "gpt-4",
            user_id: "user_b",
            path: "/v1/chat/completions",
            status: 200,
            latency: 300,
            prompt_tokens: 2000,
            completion_tokens: 1000,
            property: ("environment", "dev"),
        },
        LogFixture {
            id: "req_3",
            organization_id: TENANT,
            created_at: at(1, 15),
            model: "gpt-3.5-turbo",
            user_id: "user_a",
            path: "/v1/chat/completions",
            status: 200,
            latency: 50,
            prompt_tokens: 1000,
            completion_tokens: 1000,
            property: ("environment", "prod"),
        },
        LogFixture {
            id: "req_4",
            organization_id: TENANT,
            created_at: at(2, 5),
            model: "gpt-4",
            user_id: "user_c",
            path: "/v1/chat/completions",
            status: 500,
            latency: 900,
            prompt_tokens: 10,
            completion_tokens: 0,
            property: ("environment", "prod"),
        },
        LogFixture {
            id: "req_5",
            organization_id: OTHER_TENANT,
            created_at: at(1, 12),
            model: "gpt-4",
            user_id: "user_z",
            path: "/v1/chat/completions",
            status: 200,
            latency: 700,
            prompt_tokens: 5000,
            completion_tokens: 5000,
            property: ("environment", "prod"),
        },
    ]
}

pub async fn seed_sqlite(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for row in log_rows() {
        let micros = row.created_at.timestamp_micros();
        sqlx::query(
            "INSERT INTO request (id, organization_id, created_at, model, user_id, path) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(row.organization_id)
        .bind(micros)
        .bind(row.model)
        .bind(row.user_id)
        .bind(row.path)
        .execute(pool)
        .await?;

        sqlx::query(
            "INSERT INTO response (id, request_id, created_at, status, latency, prompt_tokens, completion_tokens, model) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(format!("resp_{}", row.id))
        .bind(row.id)
        .bind(micros)
        .bind(row.status)
        .bind(row.latency)
        .bind(row.prompt_tokens)
        .bind(row.completion_tokens)
        .bind(row.model)
        .execute(pool)
        .await?;

        sqlx::query(
            "INSERT INTO properties (request_id, organization_id, created_at, key, value) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(row.organization_id)
        .bind(micros)
        .bind(row.property.0)
        .bind(row.property.1)
        .execute(pool)
        .await?;
    }
    Ok(())
}

pub fn seed_duckdb(conn: &duckdb::Connection) -> Result<(), duckdb::Error> {
    for row in log_rows() {
        let micros = row.created_at.timestamp_micros();
        conn.execute(
            "INSERT INTO request_response_log (request_id, organization_id, created_at, model, user_id, path, status, latency, prompt_tokens, completion_tokens)
             VALUES (?, ?, make_timestamp(?), ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                row.id,
                row.organization_id,
                micros,
                row.model,
                row.user_id,
                row.path,
                row.status,
                row.latency,
                row.prompt_tokens,
                row.completion_tokens,
            ],
        )?;
        conn.execute(
            "INSERT INTO property_with_response (request_id, organization_id, created_at, property_key, property_value, model, user_id, status, latency)
             VALUES (?, ?, make_timestamp(?), ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                row.id,
                row.organization_id,
                micros,
                row.property.0,
                row.property.1,
                row.model,
                row.user_id,
                row.status,
                row.latency,
            ],
        )?;
    }
    Ok(())
}
