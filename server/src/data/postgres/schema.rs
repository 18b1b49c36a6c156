//! PostgreSQL schema definition
//!
//! Same normalized layout as the SQLite store, with native TIMESTAMPTZ.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for version 1
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS request (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    model TEXT,
    user_id TEXT,
    path TEXT
);

CREATE INDEX IF NOT EXISTS idx_request_org_created
    ON request (organization_id, created_at);

CREATE TABLE IF NOT EXISTS response (
    id TEXT PRIMARY KEY,
    request_id TEXT NOT NULL REFERENCES request (id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL,
    status BIGINT,
    latency BIGINT,
    prompt_tokens BIGINT,
    completion_tokens BIGINT,
    model TEXT
);

CREATE INDEX IF NOT EXISTS idx_response_request ON response (request_id);

CREATE TABLE IF NOT EXISTS properties (
    request_id TEXT NOT NULL REFERENCES request (id) ON DELETE CASCADE,
    organization_id TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (request_id, key)
);

CREATE INDEX IF NOT EXISTS idx_properties_org_key
    ON properties (organization_id, key);
"#;
