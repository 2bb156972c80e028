//! promkit core: transport-agnostic metric primitives, error types, and tokens.
//!
//! This crate defines the vocabulary shared by the registry resolver, the
//! metric factory and the HTTP layer: metric kinds, metric configurations, the
//! token namer used to key constructed providers, and the error surface. It
//! intentionally carries no metrics-client or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `PromError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metric;
pub mod token;

/// Shared result type.
pub use error::{PromError, Result};
pub use metric::{MetricConfiguration, MetricKind, MetricSpec};
pub use token::{metric_token, registry_name, registry_token, DEFAULT_PROM_REGISTRY};
