//! Domain logic
//!
//! - `pricing` - Ordered model pricing rules and their SQL rendering
//! - `metrics` - Dashboard metrics built on the filter compiler

pub mod metrics;
pub mod pricing;

pub use metrics::{ErrorKind, MetricKind, MetricValue, MetricsError, MetricsService};
pub use pricing::{MatchType, PricingError, PricingFacts, PricingTable, ResolvedPricing};
