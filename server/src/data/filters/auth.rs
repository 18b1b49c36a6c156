//! Tenant scoping
//!
//! Every filter handed to the compiler is wrapped with an organization
//! equality predicate. `ScopedFilter` can only be built here, so an unscoped
//! tree never reaches SQL.

use super::types::{FilterNode, LogicalColumn, LogicalTable, Operator, TenantId};

/// Filter tree that already carries the tenant predicate
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedFilter {
    source: LogicalTable,
    node: FilterNode,
}

impl ScopedFilter {
    /// Logical table the query reads from
    pub fn source(&self) -> LogicalTable {
        self.source
    }

    pub fn node(&self) -> &FilterNode {
        &self.node
    }
}

/// Conjoin `filter` with `source.organization_id = tenant`
///
/// The tenant predicate comes first, so its argument is always bound first.
pub fn scope(filter: FilterNode, tenant: &TenantId, source: LogicalTable) -> ScopedFilter {
    let tenant_leaf = FilterNode::leaf(
        source,
        LogicalColumn::OrganizationId,
        Operator::Equals,
        tenant.as_str(),
    );
    ScopedFilter {
        source,
        node: FilterNode::and(tenant_leaf, filter),
    }
}
