//! Provider cache: constructs each registry and each metric once per token.
//!
//! Registries are keyed by `registry_token(name)`; metrics by their registry
//! token plus `metric_token(kind, name)`. The first request constructs, every
//! later request receives the cached instance, provided it declares the same
//! label names and kind-specific parameters; a conflicting redeclaration fails
//! here rather than at the first observation. Populated during startup, read
//! during request handling.
//!
//! `ProviderCache::global()` is the process-wide instance; the default
//! registry is process-wide too, so metrics built into it are cached there.

use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use promkit_core::error::{PromError, Result};
use promkit_core::{metric_token, registry_name, registry_token, MetricConfiguration, MetricKind};

use crate::obs::{create_metric, resolve, DefaultMetricsOptions, Metric, PromRegistry};

type MetricKey = (String, String);

static GLOBAL: OnceLock<Arc<ProviderCache>> = OnceLock::new();

#[derive(Default)]
pub struct ProviderCache {
    registries: DashMap<String, Arc<PromRegistry>>,
    metrics: DashMap<MetricKey, Provided>,
}

struct Provided {
    metric: Metric,
    cfg: MetricConfiguration,
}

impl ProviderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> Arc<ProviderCache> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ProviderCache::new())))
    }

    /// Registry for `name`, resolved on first request.
    pub fn registry(&self, name: Option<&str>, defaults: &DefaultMetricsOptions) -> Arc<PromRegistry> {
        let token = registry_token(registry_name(name));
        let entry = self
            .registries
            .entry(token)
            .or_insert_with(|| resolve(name, defaults));
        Arc::clone(entry.value())
    }

    /// Metric for `(kind, cfg.name)` in `registry`, constructed on first request.
    /// A cached hit only checks that `cfg` has the same shape; `help` is ignored.
    pub fn metric(&self, kind: MetricKind, cfg: &MetricConfiguration, registry: &PromRegistry) -> Result<Metric> {
        let key = (registry.token().to_string(), metric_token(kind, &cfg.name));
        match self.metrics.entry(key) {
            Entry::Occupied(e) => {
                let provided = e.get();
                if !same_shape(kind, &provided.cfg, cfg) {
                    return Err(PromError::InvalidConfiguration(format!(
                        "{} already declared in registry {} with different labels or parameters",
                        e.key().1,
                        registry.name()
                    )));
                }
                tracing::trace!(token = %e.key().1, "metric provider cache hit");
                Ok(provided.metric.clone())
            }
            Entry::Vacant(e) => {
                let metric = create_metric(kind, cfg, registry)?;
                e.insert(Provided {
                    metric: metric.clone(),
                    cfg: cfg.clone(),
                });
                Ok(metric)
            }
        }
    }

    pub fn get(&self, kind: MetricKind, name: &str, registry: Option<&str>) -> Option<Metric> {
        let key = (registry_token(registry_name(registry)), metric_token(kind, name));
        self.metrics.get(&key).map(|p| p.metric.clone())
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn registry_count(&self) -> usize {
        self.registries.len()
    }
}

fn same_shape(kind: MetricKind, a: &MetricConfiguration, b: &MetricConfiguration) -> bool {
    if a.label_names != b.label_names {
        return false;
    }
    match kind {
        MetricKind::Counter | MetricKind::Gauge => true,
        MetricKind::Histogram => a.buckets_or_default() == b.buckets_or_default(),
        MetricKind::Summary => {
            a.percentiles_or_default() == b.percentiles_or_default()
                && a.max_samples_or_default() == b.max_samples_or_default()
        }
    }
}
