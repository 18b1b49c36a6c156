//! Field registry
//!
//! Maps `(LogicalTable, LogicalColumn)` to the physical column of each store
//! family. The row store keeps requests, responses and properties normalized
//! and joins them; the column store reads two denormalized wide tables.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::error::FilterError;
use super::types::{LogicalColumn, LogicalTable, ScalarKind};
use crate::data::sql::StoreFamily;

/// Physical column a logical field resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    /// Qualified column identifier, emitted verbatim into SQL
    pub identifier: &'static str,
    pub kind: ScalarKind,
    pub nullable: bool,
}

/// FROM clause backing a logical table
#[derive(Debug, Clone, Copy)]
pub struct TableSource {
    pub relation: &'static str,
    /// Logical tables whose fields are reachable through `relation`
    pub provides: &'static [LogicalTable],
}

impl TableSource {
    pub fn provides(&self, table: LogicalTable) -> bool {
        self.provides.contains(&table)
    }
}

/// Immutable per-family registry
#[derive(Debug)]
pub struct FieldRegistry {
    family: StoreFamily,
    fields: HashMap<(LogicalTable, LogicalColumn), FieldRef>,
    sources: HashMap<LogicalTable, TableSource>,
}

static ROW_REGISTRY: LazyLock<FieldRegistry> = LazyLock::new(FieldRegistry::row_store);
static COLUMN_REGISTRY: LazyLock<FieldRegistry> = LazyLock::new(FieldRegistry::column_store);

const REQUEST_RESPONSE_JOIN: &str =
    "request LEFT JOIN response ON response.request_id = request.id";
const PROPERTY_RESPONSE_JOIN: &str = "properties \
     INNER JOIN request ON request.id = properties.request_id \
     LEFT JOIN response ON response.request_id = request.id";

fn field(identifier: &'static str, kind: ScalarKind, nullable: bool) -> FieldRef {
    FieldRef {
        identifier,
        kind,
        nullable,
    }
}

impl FieldRegistry {
    /// Process-wide registry for a store family
    pub fn for_family(family: StoreFamily) -> &'static FieldRegistry {
        match family {
            StoreFamily::Row => &ROW_REGISTRY,
            StoreFamily::Column => &COLUMN_REGISTRY,
        }
    }

    pub fn family(&self) -> StoreFamily {
        self.family
    }

    /// Resolve a logical field to its physical column
    pub fn resolve(
        &self,
        table: LogicalTable,
        column: LogicalColumn,
    ) -> Result<&FieldRef, FilterError> {
        self.fields
            .get(&(table, column))
            .ok_or(FilterError::UnknownField {
                family: self.family,
                table,
                column,
            })
    }

    /// FROM clause for a logical table, if this family stores it
    pub fn source(&self, table: LogicalTable) -> Option<&TableSource> {
        self.sources.get(&table)
    }

    fn row_store() -> Self {
        use LogicalColumn as C;
        use LogicalTable as T;
        use ScalarKind::{Int, Text, Timestamp};

        let request = [
            (C::Id, field("request.id", Text, false)),
            (C::OrganizationId, field("request.organization_id", Text, false)),
            (C::CreatedAt, field("request.created_at", Timestamp, false)),
            (C::Model, field("request.model", Text, true)),
            (C::UserId, field("request.user_id", Text, true)),
            (C::Path, field("request.path", Text, true)),
        ];
        // Nullable once LEFT JOINed, so every response column is declared nullable
        let response = [
            (C::Id, field("response.id", Text, true)),
            (C::RequestId, field("response.request_id", Text, true)),
            (C::CreatedAt, field("response.created_at", Timestamp, true)),
            (C::Status, field("response.status", Int, true)),
            (C::Latency, field("response.latency", Int, true)),
            (C::PromptTokens, field("response.prompt_tokens", Int, true)),
            (C::CompletionTokens, field("response.completion_tokens", Int, true)),
            (C::Model, field("response.model", Text, true)),
        ];
        let properties = [
            (C::RequestId, field("properties.request_id", Text, false)),
            (C::OrganizationId, field("properties.organization_id", Text, false)),
            (C::CreatedAt, field("properties.created_at", Timestamp, false)),
            (C::Key, field("properties.key", Text, false)),
            (C::Value, field("properties.value", Text, false)),
        ];
        let request_response_log = [
            (C::RequestId, field("request.id", Text, false)),
            (C::OrganizationId, field("request.organization_id", Text, false)),
            (C::CreatedAt, field("request.created_at", Timestamp, false)),
            (C::Model, field("request.model", Text, true)),
            (C::UserId, field("request.user_id", Text, true)),
            (C::Path, field("request.path", Text, true)),
            (C::Status, field("response.status", Int, true)),
            (C::Latency, field("response.latency", Int, true)),
            (C::PromptTokens, field("response.prompt_tokens", Int, true)),
            (C::CompletionTokens, field("response.completion_tokens", Int, true)),
        ];
        let property_with_response = [
            (C::RequestId, field("properties.request_id", Text, false)),
            (C::OrganizationId, field("properties.organization_id", Text, false)),
            (C::CreatedAt, field("request.created_at", Timestamp, false)),
            (C::Key, field("properties.key", Text, false)),
            (C::Value, field("properties.value", Text, false)),
            (C::Model, field("request.model", Text, true)),
            (C::UserId, field("request.user_id", Text, true)),
            (C::Status, field("response.status", Int, true)),
            (C::Latency, field("response.latency", Int, true)),
        ];

        let mut fields = HashMap::new();
        for (table, columns) in [
            (T::Request, &request[..]),
            (T::Response, &response[..]),
            (T::Properties, &properties[..]),
            (T::RequestResponseLog, &request_response_log[..]),
            (T::PropertyWithResponse, &property_with_response[..]),
        ] {
            for (column, field_ref) in columns {
                fields.insert((table, *column), *field_ref);
            }
        }

        let sources = HashMap::from([
            (
                T::Request,
                TableSource {
                    relation: "request",
                    provides: &[T::Request],
                },
            ),
            (
                T::Response,
                TableSource {
                    relation: "response",
                    provides: &[T::Response],
                },
            ),
            (
                T::Properties,
                TableSource {
                    relation: "properties",
                    provides: &[T::Properties],
                },
            ),
            (
                T::RequestResponseLog,
                TableSource {
                    relation: REQUEST_RESPONSE_JOIN,
                    provides: &[T::RequestResponseLog, T::Request, T::Response],
                },
            ),
            (
                T::PropertyWithResponse,
                TableSource {
                    relation: PROPERTY_RESPONSE_JOIN,
                    provides: &[
                        T::PropertyWithResponse,
                        T::Properties,
                        T::Request,
                        T::Response,
                    ],
                },
            ),
        ]);

        Self {
            family: StoreFamily::Row,
            fields,
            sources,
        }
    }

    fn column_store() -> Self {
        use LogicalColumn as C;
        use LogicalTable as T;
        use ScalarKind::{Int, Text, Timestamp};

        let request_response_log = [
            (C::RequestId, field("request_response_log.request_id", Text, false)),
            (
                C::OrganizationId,
                field("request_response_log.organization_id", Text, false),
            ),
            (C::CreatedAt, field("request_response_log.created_at", Timestamp, false)),
            (C::Model, field("request_response_log.model", Text, true)),
            (C::UserId, field("request_response_log.user_id", Text, true)),
            (C::Path, field("request_response_log.path", Text, true)),
            (C::Status, field("request_response_log.status", Int, true)),
            (C::Latency, field("request_response_log.latency", Int, true)),
            (
                C::PromptTokens,
                field("request_response_log.prompt_tokens", Int, true),
            ),
            (
                C::CompletionTokens,
                field("request_response_log.completion_tokens", Int, true),
            ),
        ];
        let property_with_response = [
            (C::RequestId, field("property_with_response.request_id", Text, false)),
            (
                C::OrganizationId,
                field("property_with_response.organization_id", Text, false),
            ),
            (
                C::CreatedAt,
                field("property_with_response.created_at", Timestamp, false),
            ),
            (C::Key, field("property_with_response.property_key", Text, false)),
            (C::Value, field("property_with_response.property_value", Text, false)),
            (C::Model, field("property_with_response.model", Text, true)),
            (C::UserId, field("property_with_response.user_id", Text, true)),
            (C::Status, field("property_with_response.status", Int, true)),
            (C::Latency, field("property_with_response.latency", Int, true)),
        ];

        let mut fields = HashMap::new();
        for (table, columns) in [
            (T::RequestResponseLog, &request_response_log[..]),
            (T::PropertyWithResponse, &property_with_response[..]),
        ] {
            for (column, field_ref) in columns {
                fields.insert((table, *column), *field_ref);
            }
        }

        let sources = HashMap::from([
            (
                T::RequestResponseLog,
                TableSource {
                    relation: "request_response_log",
                    provides: &[T::RequestResponseLog],
                },
            ),
            (
                T::PropertyWithResponse,
                TableSource {
                    relation: "property_with_response",
                    provides: &[T::PropertyWithResponse],
                },
            ),
        ]);

        Self {
            family: StoreFamily::Column,
            fields,
            sources,
        }
    }
}
