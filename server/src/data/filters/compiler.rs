//! SQL filter compiler
//!
//! Renders a `ScopedFilter` into a parameterized WHERE fragment for one
//! backend. Identifiers come from the field registry and operators from a
//! fixed table; every user value goes through a placeholder.

use serde::Serialize;

use super::auth::ScopedFilter;
use super::error::FilterError;
use super::registry::{FieldRef, FieldRegistry, TableSource};
use super::types::{FilterNode, Leaf, LogicalColumn, Operator, Scalar, ScalarKind};
use crate::data::sql::{Backend, SqlDialect};

/// Collects SQL parameters during query building (maintains insertion order)
#[derive(Debug)]
pub struct SqlParams {
    backend: Backend,
    values: Vec<Scalar>,
}

impl SqlParams {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            values: Vec::new(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.backend.dialect()
    }

    /// Bind a value and return the placeholder referencing it
    pub fn push(&mut self, value: Scalar) -> String {
        self.values.push(value);
        self.backend.dialect().placeholder(self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    /// Pair the accumulated arguments with the final text
    fn finish(self, text: String) -> CompiledQuery {
        CompiledQuery {
            backend: self.backend,
            text,
            args: self.values,
        }
    }
}

#[cfg(test)]
impl SqlParams {
    /// Pair the arguments with hand-written text that carries no tenant scope
    pub(crate) fn finish_raw(self, text: impl Into<String>) -> CompiledQuery {
        self.finish(text.into())
    }
}

/// Query text and its ordered arguments
///
/// Only `SqlCompiler` builds one, from a `ScopedFilter`, so every query
/// carries the tenant predicate and placeholders and arguments line up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    backend: Backend,
    text: String,
    args: Vec<Scalar>,
}

impl CompiledQuery {
    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn args(&self) -> &[Scalar] {
        &self.args
    }
}

/// Filter compiler bound to one backend
#[derive(Debug, Clone, Copy)]
pub struct SqlCompiler {
    backend: Backend,
    registry: &'static FieldRegistry,
}

impl SqlCompiler {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            registry: FieldRegistry::for_family(backend.family()),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn registry(&self) -> &'static FieldRegistry {
        self.registry
    }

    /// Compile a scoped filter into a standalone WHERE fragment
    pub fn compile(&self, filter: &ScopedFilter) -> Result<CompiledQuery, FilterError> {
        let mut params = SqlParams::new(self.backend);
        let text = self.compile_into(&mut params, filter)?;
        tracing::trace!(
            backend = %self.backend,
            args = params.len(),
            "Compiled filter"
        );
        Ok(params.finish(text))
    }

    /// Build `SELECT <select> FROM <source relation> WHERE <scoped filter>`
    ///
    /// `select` binds its own parameters first so `?` placeholders stay in
    /// textual order. The relation is the registry source of the filter's
    /// scoped table, so the tenant predicate always applies to the rows read.
    pub fn select<F>(&self, filter: &ScopedFilter, select: F) -> Result<CompiledQuery, FilterError>
    where
        F: FnOnce(&mut SqlParams) -> Result<String, FilterError>,
    {
        let relation = self.source(filter)?.relation;
        let mut params = SqlParams::new(self.backend);
        let select = select(&mut params)?;
        let predicate = self.compile_into(&mut params, filter)?;
        tracing::trace!(
            backend = %self.backend,
            table = %filter.source(),
            args = params.len(),
            "Compiled scoped select"
        );
        Ok(params.finish(format!(
            "SELECT {} FROM {} WHERE {}",
            select, relation, predicate
        )))
    }

    /// Compile into an accumulator shared with other bound fragments
    ///
    /// Arguments are appended in textual order. On error the accumulator is
    /// left exactly as it was.
    pub fn compile_into(
        &self,
        params: &mut SqlParams,
        filter: &ScopedFilter,
    ) -> Result<String, FilterError> {
        if params.backend() != self.backend {
            return Err(FilterError::InvalidFilterShape(format!(
                "parameters were collected for {}, compiler targets {}",
                params.backend(),
                self.backend
            )));
        }

        let source = self.source(filter)?;
        let mark = params.len();
        let result = self.compile_node(params, source, filter.node());
        if result.is_err() {
            params.truncate(mark);
        }
        result
    }

    fn source(&self, filter: &ScopedFilter) -> Result<&'static TableSource, FilterError> {
        self.registry
            .source(filter.source())
            .ok_or(FilterError::UnknownField {
                family: self.registry.family(),
                table: filter.source(),
                column: LogicalColumn::OrganizationId,
            })
    }

    fn compile_node(
        &self,
        params: &mut SqlParams,
        source: &TableSource,
        node: &FilterNode,
    ) -> Result<String, FilterError> {
        match node {
            FilterNode::All => Ok("TRUE".to_string()),
            FilterNode::Leaf(leaf) => self.compile_leaf(params, source, leaf),
            FilterNode::Branch {
                left,
                right,
                operator,
            } => {
                let left = self.compile_node(params, source, left)?;
                let right = self.compile_node(params, source, right)?;
                Ok(format!("({}) {} ({})", left, operator.sql(), right))
            }
        }
    }

    fn compile_leaf(
        &self,
        params: &mut SqlParams,
        source: &TableSource,
        leaf: &Leaf,
    ) -> Result<String, FilterError> {
        if !source.provides(leaf.table) {
            return Err(FilterError::UnknownField {
                family: self.registry.family(),
                table: leaf.table,
                column: leaf.column,
            });
        }
        let field = self.registry.resolve(leaf.table, leaf.column)?;
        let name = format!("{}.{}", leaf.table, leaf.column);

        if !leaf.operator.supports(field.kind) {
            return Err(FilterError::UnsupportedOperator {
                field: name,
                operator: leaf.operator,
                kind: field.kind,
            });
        }

        let dialect = self.backend.dialect();
        let col = field.identifier;

        match leaf.operator {
            Operator::IsNull | Operator::IsNotNull => {
                if leaf.value != Scalar::Null {
                    return Err(type_mismatch(&name, "null", &leaf.value));
                }
                let check = if leaf.operator == Operator::IsNull {
                    "IS NULL"
                } else {
                    "IS NOT NULL"
                };
                Ok(format!("{} {}", col, check))
            }
            Operator::In => {
                let Scalar::List(items) = &leaf.value else {
                    return Err(type_mismatch(&name, "list", &leaf.value));
                };
                if items.is_empty() {
                    return Ok("FALSE".to_string());
                }
                let mut placeholders = Vec::with_capacity(items.len());
                for item in items {
                    placeholders.push(self.bind(params, &name, field, item)?);
                }
                Ok(format!("{} IN ({})", col, placeholders.join(", ")))
            }
            Operator::Contains => {
                let ph = self.bind(params, &name, field, &leaf.value)?;
                Ok(dialect.contains(col, &ph))
            }
            Operator::Like => {
                let ph = self.bind(params, &name, field, &leaf.value)?;
                Ok(format!("{} LIKE {}", col, ph))
            }
            Operator::Equals
            | Operator::NotEquals
            | Operator::GreaterThan
            | Operator::LessThan
            | Operator::GreaterOrEqual
            | Operator::LessOrEqual => {
                let ph = self.bind(params, &name, field, &leaf.value)?;
                Ok(format!("{} {} {}", col, comparison_sql(leaf.operator), ph))
            }
        }
    }

    /// Check `value` against the field kind, encode it and push it
    fn bind(
        &self,
        params: &mut SqlParams,
        name: &str,
        field: &FieldRef,
        value: &Scalar,
    ) -> Result<String, FilterError> {
        let dialect = self.backend.dialect();
        let encoded = match (field.kind, value) {
            (ScalarKind::Bool, Scalar::Bool(b)) => dialect.encode_bool(*b),
            (ScalarKind::Int, Scalar::Int(i)) => Scalar::Int(*i),
            (ScalarKind::Float, Scalar::Float(f)) => Scalar::Float(*f),
            (ScalarKind::Float, Scalar::Int(i)) => Scalar::Float(*i as f64),
            (ScalarKind::Text, Scalar::Text(s)) => Scalar::Text(s.clone()),
            (ScalarKind::Timestamp, Scalar::Timestamp(ts)) => dialect.encode_timestamp(*ts),
            (kind, other) => return Err(type_mismatch(name, kind.name(), other)),
        };
        let ph = params.push(encoded);
        if field.kind == ScalarKind::Timestamp {
            Ok(dialect.timestamp_param(&ph))
        } else {
            Ok(ph)
        }
    }
}

fn comparison_sql(operator: Operator) -> &'static str {
    match operator {
        Operator::NotEquals => "<>",
        Operator::GreaterThan => ">",
        Operator::LessThan => "<",
        Operator::GreaterOrEqual => ">=",
        Operator::LessOrEqual => "<=",
        _ => "=",
    }
}

fn type_mismatch(field: &str, expected: &str, actual: &Scalar) -> FilterError {
    FilterError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}
