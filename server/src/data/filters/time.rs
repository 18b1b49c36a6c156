//! Time range to filter node conversion

use super::types::{FilterNode, LogicalColumn, LogicalTable, Operator, TimeFilter};

/// Inclusive `created_at` bounds for `table`
///
/// Both ends compare with `>=` / `<=` in every dialect.
pub fn time_filter_to_node(time_filter: &TimeFilter, table: LogicalTable) -> FilterNode {
    FilterNode::and(
        FilterNode::leaf(
            table,
            LogicalColumn::CreatedAt,
            Operator::GreaterOrEqual,
            time_filter.start(),
        ),
        FilterNode::leaf(
            table,
            LogicalColumn::CreatedAt,
            Operator::LessOrEqual,
            time_filter.end(),
        ),
    )
}
