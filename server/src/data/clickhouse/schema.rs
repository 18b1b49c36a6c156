//! ClickHouse schema definition
//!
//! Same denormalized layout as the DuckDB store. Timestamps are
//! `DateTime64(6, 'UTC')` and tables are ordered for tenant-first scans.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Schema statements for version 1, applied in order
pub const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS schema_version (
        id UInt8,
        version Int32,
        applied_at DateTime64(6, 'UTC')
    ) ENGINE = ReplacingMergeTree(applied_at)
    ORDER BY id"#,
    r#"CREATE TABLE IF NOT EXISTS request_response_log (
        request_id String,
        organization_id String,
        created_at DateTime64(6, 'UTC'),
        model Nullable(String),
        user_id Nullable(String),
        path Nullable(String),
        status Nullable(Int64),
        latency Nullable(Int64),
        prompt_tokens Nullable(Int64),
        completion_tokens Nullable(Int64)
    ) ENGINE = MergeTree
    PARTITION BY toYYYYMM(created_at)
    ORDER BY (organization_id, created_at, request_id)"#,
    r#"CREATE TABLE IF NOT EXISTS property_with_response (
        request_id String,
        organization_id String,
        created_at DateTime64(6, 'UTC'),
        property_key String,
        property_value String,
        model Nullable(String),
        user_id Nullable(String),
        status Nullable(Int64),
        latency Nullable(Int64)
    ) ENGINE = MergeTree
    PARTITION BY toYYYYMM(created_at)
    ORDER BY (organization_id, property_key, created_at, request_id)"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_table_first() {
        assert!(SCHEMA[0].contains("schema_version"));
        assert!(SCHEMA.iter().all(|s| s.contains("IF NOT EXISTS")));
    }
}
