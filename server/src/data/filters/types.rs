//! Filter type definitions
//!
//! Defines the filter tree, operators and scalar values used to query
//! request logs, plus the validated time range and tenant identifier.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::FilterError;

/// Logical table a leaf refers to
///
/// The physical relation behind each name depends on the store family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogicalTable {
    Request,
    Response,
    Properties,
    RequestResponseLog,
    PropertyWithResponse,
}

impl LogicalTable {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalTable::Request => "request",
            LogicalTable::Response => "response",
            LogicalTable::Properties => "properties",
            LogicalTable::RequestResponseLog => "request_response_log",
            LogicalTable::PropertyWithResponse => "property_with_response",
        }
    }
}

impl fmt::Display for LogicalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical column a leaf refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalColumn {
    Id,
    RequestId,
    OrganizationId,
    CreatedAt,
    Model,
    UserId,
    Path,
    Status,
    Latency,
    PromptTokens,
    CompletionTokens,
    Key,
    Value,
}

impl LogicalColumn {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalColumn::Id => "id",
            LogicalColumn::RequestId => "request_id",
            LogicalColumn::OrganizationId => "organization_id",
            LogicalColumn::CreatedAt => "created_at",
            LogicalColumn::Model => "model",
            LogicalColumn::UserId => "user_id",
            LogicalColumn::Path => "path",
            LogicalColumn::Status => "status",
            LogicalColumn::Latency => "latency",
            LogicalColumn::PromptTokens => "prompt_tokens",
            LogicalColumn::CompletionTokens => "completion_tokens",
            LogicalColumn::Key => "key",
            LogicalColumn::Value => "value",
        }
    }

    /// Declared kind of the column, identical in every store family
    pub fn kind(&self) -> ScalarKind {
        match self {
            LogicalColumn::CreatedAt => ScalarKind::Timestamp,
            LogicalColumn::Status
            | LogicalColumn::Latency
            | LogicalColumn::PromptTokens
            | LogicalColumn::CompletionTokens => ScalarKind::Int,
            LogicalColumn::Id
            | LogicalColumn::RequestId
            | LogicalColumn::OrganizationId
            | LogicalColumn::Model
            | LogicalColumn::UserId
            | LogicalColumn::Path
            | LogicalColumn::Key
            | LogicalColumn::Value => ScalarKind::Text,
        }
    }
}

impl fmt::Display for LogicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Leaf comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Like,
    IsNull,
    IsNotNull,
    Contains,
    In,
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterOrEqual => "greater_or_equal",
            Operator::LessOrEqual => "less_or_equal",
            Operator::Like => "like",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
            Operator::Contains => "contains",
            Operator::In => "in",
        }
    }

    /// Whether the operator applies to a column of the given kind
    pub fn supports(&self, kind: ScalarKind) -> bool {
        match self {
            Operator::Equals | Operator::NotEquals | Operator::IsNull | Operator::IsNotNull => {
                true
            }
            Operator::GreaterThan
            | Operator::LessThan
            | Operator::GreaterOrEqual
            | Operator::LessOrEqual => matches!(
                kind,
                ScalarKind::Int | ScalarKind::Float | ScalarKind::Timestamp
            ),
            Operator::Like | Operator::Contains => kind == ScalarKind::Text,
            Operator::In => kind != ScalarKind::Bool,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Boolean connective of a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn sql(&self) -> &'static str {
        match self {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
        }
    }
}

/// Declared kind of a registry column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Text => "text",
            ScalarKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value carried by a leaf, and by compiled query arguments
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    /// Operand of `in` only
    List(Vec<Scalar>),
}

impl Scalar {
    /// Human-readable type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "text",
            Scalar::Timestamp(_) => "timestamp",
            Scalar::List(_) => "list",
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(value: DateTime<Utc>) -> Self {
        Scalar::Timestamp(value)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for Scalar {
    fn from(values: Vec<T>) -> Self {
        Scalar::List(values.into_iter().map(Into::into).collect())
    }
}

/// Single column comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub table: LogicalTable,
    pub column: LogicalColumn,
    pub operator: Operator,
    pub value: Scalar,
}

/// Recursive boolean filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf(Leaf),
    Branch {
        left: Box<FilterNode>,
        right: Box<FilterNode>,
        operator: BoolOp,
    },
    /// Matches every row
    All,
}

impl FilterNode {
    pub fn leaf(
        table: LogicalTable,
        column: LogicalColumn,
        operator: Operator,
        value: impl Into<Scalar>,
    ) -> Self {
        FilterNode::Leaf(Leaf {
            table,
            column,
            operator,
            value: value.into(),
        })
    }

    pub fn and(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            operator: BoolOp::And,
        }
    }

    pub fn or(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            operator: BoolOp::Or,
        }
    }

    /// Nesting depth, a lone leaf or `All` being 1
    pub fn depth(&self) -> usize {
        match self {
            FilterNode::Leaf(_) | FilterNode::All => 1,
            FilterNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Inclusive UTC time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFilter {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeFilter {
    /// Build a range, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, FilterError> {
        if start > end {
            return Err(FilterError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Organization identifier supplied by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(value: impl Into<String>) -> Result<Self, FilterError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(FilterError::InvalidTenant);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
