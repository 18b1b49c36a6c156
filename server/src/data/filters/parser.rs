//! Request body parsing
//!
//! Parses the inbound JSON body into a `FilterNode` and a `TimeFilter`.
//! The wire shape is validated by serde; leaf values are converted using
//! the declared kind of the column they compare against.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::error::FilterError;
use super::types::{
    BoolOp, FilterNode, Leaf, LogicalColumn, LogicalTable, Operator, Scalar, ScalarKind,
    TimeFilter,
};

/// Maximum size of a request body in bytes (64KB)
const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;

/// Maximum nesting depth of a filter tree
const MAX_FILTER_DEPTH: usize = 32;

/// Parsed and validated request body
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub filter: FilterNode,
    pub time_filter: TimeFilter,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BodyWire {
    #[serde(default)]
    filter: Option<NodeWire>,
    #[serde(default, rename = "timeFilter")]
    time_filter: Option<TimeFilterWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NodeWire {
    Leaf(LeafWire),
    Branch(BranchWire),
    All,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LeafWire {
    table: LogicalTable,
    column: LogicalColumn,
    operator: Operator,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BranchWire {
    left: Box<NodeWire>,
    right: Box<NodeWire>,
    operator: BoolOp,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeFilterWire {
    start: InstantWire,
    end: InstantWire,
}

/// RFC 3339 string or epoch milliseconds
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstantWire {
    Millis(i64),
    Text(String),
}

/// Parse a request body
///
/// An absent filter means `All`; an absent time filter is an error.
pub fn parse_request_body(json: &str) -> Result<RequestBody, FilterError> {
    if json.len() > MAX_FILTER_JSON_SIZE {
        return Err(FilterError::InvalidFilterShape(format!(
            "body exceeds maximum size of {} bytes",
            MAX_FILTER_JSON_SIZE
        )));
    }

    let wire: BodyWire = serde_json::from_str(json)
        .map_err(|e| FilterError::InvalidFilterShape(e.to_string()))?;

    let time_filter = wire.time_filter.ok_or(FilterError::MissingTimeFilter)?;
    let start = parse_instant("timeFilter.start", time_filter.start)?;
    let end = parse_instant("timeFilter.end", time_filter.end)?;
    let time_filter = TimeFilter::new(start, end)?;

    let filter = match wire.filter {
        Some(node) => convert_node(node, 1)?,
        None => FilterNode::All,
    };

    Ok(RequestBody {
        filter,
        time_filter,
    })
}

fn parse_instant(field: &str, instant: InstantWire) -> Result<DateTime<Utc>, FilterError> {
    match instant {
        InstantWire::Millis(ms) => DateTime::from_timestamp_millis(ms).ok_or_else(|| {
            FilterError::InvalidFilterShape(format!("{}: timestamp out of range", field))
        }),
        InstantWire::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| FilterError::InvalidFilterShape(format!("{}: {}", field, e))),
    }
}

fn convert_node(node: NodeWire, depth: usize) -> Result<FilterNode, FilterError> {
    if depth > MAX_FILTER_DEPTH {
        return Err(FilterError::InvalidFilterShape(format!(
            "filter nesting exceeds {} levels",
            MAX_FILTER_DEPTH
        )));
    }

    match node {
        NodeWire::All => Ok(FilterNode::All),
        NodeWire::Leaf(leaf) => {
            let field = format!("{}.{}", leaf.table, leaf.column);
            let value = convert_value(&field, leaf.column.kind(), leaf.value)?;
            Ok(FilterNode::Leaf(Leaf {
                table: leaf.table,
                column: leaf.column,
                operator: leaf.operator,
                value,
            }))
        }
        NodeWire::Branch(branch) => Ok(FilterNode::Branch {
            left: Box::new(convert_node(*branch.left, depth + 1)?),
            right: Box::new(convert_node(*branch.right, depth + 1)?),
            operator: branch.operator,
        }),
    }
}

fn convert_value(field: &str, kind: ScalarKind, value: Value) -> Result<Scalar, FilterError> {
    let mismatch = |actual: &str| FilterError::TypeMismatch {
        field: field.to_string(),
        expected: kind.name().to_string(),
        actual: actual.to_string(),
    };

    match value {
        Value::Null => Ok(Scalar::Null),
        Value::Bool(b) => Ok(Scalar::Bool(b)),
        Value::Number(n) => match kind {
            ScalarKind::Timestamp => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(Scalar::Timestamp)
                .ok_or_else(|| mismatch("number")),
            ScalarKind::Float => n.as_f64().map(Scalar::Float).ok_or_else(|| mismatch("number")),
            _ => match n.as_i64() {
                Some(i) => Ok(Scalar::Int(i)),
                None => n.as_f64().map(Scalar::Float).ok_or_else(|| mismatch("number")),
            },
        },
        Value::String(s) if kind == ScalarKind::Timestamp => DateTime::parse_from_rfc3339(&s)
            .map(|ts| Scalar::Timestamp(ts.with_timezone(&Utc)))
            .map_err(|_| mismatch("text")),
        Value::String(s) => Ok(Scalar::Text(s)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Array(_) => Err(mismatch("nested list")),
                other => convert_value(field, kind, other),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Scalar::List),
        Value::Object(_) => Err(FilterError::InvalidFilterShape(format!(
            "{}: value must be a scalar or a list",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const JANUARY: &str = r#""timeFilter": {"start": "2024-01-01T00:00:00Z", "end": "2024-01-31T23:59:59Z"}"#;

    fn body(filter: &str) -> String {
        format!(r#"{{"filter": {}, {}}}"#, filter, JANUARY)
    }

    #[test]
    fn parse_leaf() {
        let json = body(
            r#"{"leaf": {"table": "request_response_log", "column": "model", "operator": "equals", "value": "gpt-4"}}"#,
        );
        let parsed = parse_request_body(&json).unwrap();
        assert_eq!(
            parsed.filter,
            FilterNode::leaf(
                LogicalTable::RequestResponseLog,
                LogicalColumn::Model,
                Operator::Equals,
                "gpt-4"
            )
        );
        assert_eq!(
            parsed.time_filter.start(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn parse_branch_and_all() {
        let json = body(
            r#"{"branch": {
                "left": {"leaf": {"table": "request_response_log", "column": "latency", "operator": "greater_than", "value": 250}},
                "right": "all",
                "operator": "or"
            }}"#,
        );
        let parsed = parse_request_body(&json).unwrap();
        assert_eq!(
            parsed.filter,
            FilterNode::or(
                FilterNode::leaf(
                    LogicalTable::RequestResponseLog,
                    LogicalColumn::Latency,
                    Operator::GreaterThan,
                    250i64
                ),
                FilterNode::All
            )
        );
    }

    #[test]
    fn parse_missing_filter_is_all() {
        let json = format!("{{{}}}", JANUARY);
        assert_eq!(parse_request_body(&json).unwrap().filter, FilterNode::All);
    }

    #[test]
    fn parse_missing_time_filter() {
        let json = r#"{"filter": "all"}"#;
        assert_eq!(
            parse_request_body(json).unwrap_err(),
            FilterError::MissingTimeFilter
        );
    }

    #[test]
    fn parse_inverted_time_range() {
        let json = r#"{"timeFilter": {"start": "2024-02-01T00:00:00Z", "end": "2024-01-01T00:00:00Z"}}"#;
        assert!(matches!(
            parse_request_body(json).unwrap_err(),
            FilterError::InvalidTimeRange { .. }
        ));
    }

    #[test]
    fn parse_epoch_millis_time_filter() {
        let json = r#"{"timeFilter": {"start": 1704067200000, "end": 1706745599000}}"#;
        let parsed = parse_request_body(json).unwrap();
        assert_eq!(
            parsed.time_filter.end(),
            Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn parse_malformed_json() {
        assert!(matches!(
            parse_request_body("not valid json").unwrap_err(),
            FilterError::InvalidFilterShape(_)
        ));
    }

    #[test]
    fn parse_unknown_fields_rejected() {
        let json = body(
            r#"{"leaf": {"table": "request", "column": "model", "operator": "equals", "value": "x", "extra": 1}}"#,
        );
        assert!(matches!(
            parse_request_body(&json).unwrap_err(),
            FilterError::InvalidFilterShape(_)
        ));

        let json = format!(r#"{{"filter": "all", "orgId": "org_2", {}}}"#, JANUARY);
        assert!(matches!(
            parse_request_body(&json).unwrap_err(),
            FilterError::InvalidFilterShape(_)
        ));
    }

    #[test]
    fn parse_unknown_operator_rejected() {
        let json = body(
            r#"{"leaf": {"table": "request", "column": "model", "operator": "regex", "value": ".*"}}"#,
        );
        assert!(matches!(
            parse_request_body(&json).unwrap_err(),
            FilterError::InvalidFilterShape(_)
        ));
    }

    #[test]
    fn parse_timestamp_values() {
        let json = body(
            r#"{"leaf": {"table": "request", "column": "created_at", "operator": "greater_or_equal", "value": "2024-01-15T12:00:00+02:00"}}"#,
        );
        let parsed = parse_request_body(&json).unwrap();
        let FilterNode::Leaf(leaf) = parsed.filter else {
            panic!("expected leaf");
        };
        assert_eq!(
            leaf.value,
            Scalar::Timestamp(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn parse_bad_timestamp_value() {
        let json = body(
            r#"{"leaf": {"table": "request", "column": "created_at", "operator": "equals", "value": "yesterday"}}"#,
        );
        assert!(matches!(
            parse_request_body(&json).unwrap_err(),
            FilterError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn parse_in_list_and_null_check() {
        let json = body(
            r#"{"branch": {
                "left": {"leaf": {"table": "request_response_log", "column": "status", "operator": "in", "value": [200, 201]}},
                "right": {"leaf": {"table": "request_response_log", "column": "user_id", "operator": "is_null"}},
                "operator": "and"
            }}"#,
        );
        let parsed = parse_request_body(&json).unwrap();
        assert_eq!(
            parsed.filter,
            FilterNode::and(
                FilterNode::leaf(
                    LogicalTable::RequestResponseLog,
                    LogicalColumn::Status,
                    Operator::In,
                    vec![200i64, 201]
                ),
                FilterNode::leaf(
                    LogicalTable::RequestResponseLog,
                    LogicalColumn::UserId,
                    Operator::IsNull,
                    Scalar::Null
                )
            )
        );
    }

    #[test]
    fn parse_object_value_rejected() {
        let json = body(
            r#"{"leaf": {"table": "request", "column": "model", "operator": "equals", "value": {"$ne": 1}}}"#,
        );
        assert!(matches!(
            parse_request_body(&json).unwrap_err(),
            FilterError::InvalidFilterShape(_)
        ));
    }

    #[test]
    fn parse_too_deep() {
        let mut node = r#""all""#.to_string();
        for _ in 0..MAX_FILTER_DEPTH {
            node = format!(
                r#"{{"branch": {{"left": {}, "right": "all", "operator": "and"}}}}"#,
                node
            );
        }
        assert!(matches!(
            parse_request_body(&body(&node)).unwrap_err(),
            FilterError::InvalidFilterShape(_)
        ));
    }

    #[test]
    fn parse_too_large() {
        let json = format!(r#"{{"pad": "{}"}}"#, "x".repeat(MAX_FILTER_JSON_SIZE));
        let err = parse_request_body(&json).unwrap_err();
        assert!(err.to_string().contains("maximum size"));
    }
}
