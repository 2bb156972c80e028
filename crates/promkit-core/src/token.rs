//! Provider tokens.
//!
//! Tokens are the lookup keys under which constructed registries and metrics
//! are cached. Registry and metric tokens live in separate namespaces, and the
//! metric kind is a fixed segment, so distinct inputs never collide.

use crate::metric::MetricKind;

/// Reserved registry name for the process-wide default registry.
pub const DEFAULT_PROM_REGISTRY: &str = "default";

/// Normalize a requested registry name. Omitted or blank names mean the
/// default registry.
pub fn registry_name(name: Option<&str>) -> &str {
    match name.map(str::trim) {
        None | Some("") => DEFAULT_PROM_REGISTRY,
        Some(n) => n,
    }
}

pub fn registry_token(name: &str) -> String {
    format!("prom:registry:{}", registry_name(Some(name)))
}

pub fn metric_token(kind: MetricKind, name: &str) -> String {
    format!("prom:metric:{}:{}", kind.as_str(), name)
}
