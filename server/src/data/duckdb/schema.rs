//! DuckDB schema definition
//!
//! Denormalized request log tables, one row per request and one row per
//! request property.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for version 1
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL,
    applied_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS request_response_log (
    request_id VARCHAR NOT NULL,
    organization_id VARCHAR NOT NULL,
    created_at TIMESTAMP NOT NULL,
    model VARCHAR,
    user_id VARCHAR,
    path VARCHAR,
    status BIGINT,
    latency BIGINT,
    prompt_tokens BIGINT,
    completion_tokens BIGINT
);

CREATE TABLE IF NOT EXISTS property_with_response (
    request_id VARCHAR NOT NULL,
    organization_id VARCHAR NOT NULL,
    created_at TIMESTAMP NOT NULL,
    property_key VARCHAR NOT NULL,
    property_value VARCHAR NOT NULL,
    model VARCHAR,
    user_id VARCHAR,
    status BIGINT,
    latency BIGINT
);
"#;
