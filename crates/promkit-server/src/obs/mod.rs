//! Metric registries and the metrics built into them.
//!
//! The `prometheus` crate is the metrics client: it owns storage, registration
//! and text encoding. This module decides which registry a caller gets, what
//! default runtime metrics are attached to it, and how a declared metric turns
//! into a registered client metric. The client has no summary type, so one is
//! provided here as a custom collector.

pub mod defaults;
pub mod factory;
pub mod registry;
pub mod summary;

pub use defaults::{DefaultMetricsCollector, DefaultMetricsOptions};
pub use factory::{create_metric, create_metric_from_spec, Metric};
pub use registry::{default_registry, resolve, PromRegistry};
pub use summary::{Summary, SummaryOpts, SummaryVec};
