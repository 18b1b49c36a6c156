//! Filter expression compiler
//!
//! - `types` - Filter tree, scalar values, time range and tenant id
//! - `registry` - Logical to physical field mapping per store family
//! - `time` - Time range to filter node conversion
//! - `auth` - Tenant scoping
//! - `compiler` - Parameterized SQL rendering
//! - `parser` - Request body parsing

pub mod auth;
pub mod compiler;
mod error;
pub mod parser;
pub mod registry;
pub mod time;
pub mod types;

pub use auth::{ScopedFilter, scope};
pub use compiler::{CompiledQuery, SqlCompiler, SqlParams};
pub use error::FilterError;
pub use parser::{RequestBody, parse_request_body};
pub use registry::{FieldRef, FieldRegistry, TableSource};
pub use time::time_filter_to_node;
pub use types::{
    BoolOp, FilterNode, Leaf, LogicalColumn, LogicalTable, Operator, Scalar, ScalarKind,
    TenantId, TimeFilter,
};
