//! Prom module: one registry scope with its options, request counter and
//! declared metrics.
//!
//! `for_root` is the synchronous entry point; `for_root_async` obtains options
//! from a `PromOptionsFactory` first. Metrics declared through `for_metrics`
//! and the `for_*` helpers go through the module's provider cache, so a metric
//! declared twice by independent components is built once.

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::{CounterVec, GaugeVec, HistogramVec};
use promkit_core::error::{PromError, Result};
use promkit_core::{MetricConfiguration, MetricKind, MetricSpec};

use crate::config::schema::HTTP_REQUEST_LABELS;
use crate::config::PromOptions;
use crate::container::ProviderCache;
use crate::middleware::InboundMiddleware;
use crate::obs::{Metric, PromRegistry, SummaryVec};

pub const METRIC_HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// Produces module options at startup, e.g. from a secrets store or another
/// service's config.
#[async_trait]
pub trait PromOptionsFactory: Send + Sync {
    async fn create_prom_options(&self, name: Option<&str>) -> Result<PromOptions>;
}

#[derive(Clone)]
pub struct PromModule {
    inner: Arc<PromModuleInner>,
}

struct PromModuleInner {
    options: Arc<PromOptions>,
    registry: Arc<PromRegistry>,
    providers: Arc<ProviderCache>,
    http_requests: CounterVec,
}

impl PromModule {
    /// Build against the process-wide provider cache: modules naming the same
    /// registry share it and its metrics.
    pub fn for_root(options: PromOptions) -> Result<Self> {
        Self::with_providers(options, ProviderCache::global())
    }

    /// Build against a caller-owned provider cache.
    pub fn with_providers(options: PromOptions, providers: Arc<ProviderCache>) -> Result<Self> {
        options.validate()?;

        let registry = providers.registry(options.registry_name.as_deref(), &options.default_metrics());
        if !options.default_labels.is_empty() {
            registry.set_default_labels(options.default_labels.clone());
        }

        let http_requests = providers
            .metric(MetricKind::Counter, &http_requests_configuration(), &registry)?
            .as_counter()
            .cloned()
            .ok_or_else(|| PromError::Internal(format!("{METRIC_HTTP_REQUESTS_TOTAL} is not a counter")))?;

        if !options.extra.is_empty() {
            let keys: Vec<&str> = options.extra.keys().map(String::as_str).collect();
            tracing::debug!(?keys, "unrecognized prom options kept");
        }
        tracing::info!(
            registry = registry.name(),
            default_metrics = registry.has_default_metrics(),
            http_counter = options.enable_http_counter_middleware,
            metrics_path = %options.metrics_path(),
            "prom module ready"
        );

        Ok(Self {
            inner: Arc::new(PromModuleInner {
                options: Arc::new(options),
                registry,
                providers,
                http_requests,
            }),
        })
    }

    pub async fn for_root_async(factory: &dyn PromOptionsFactory, name: Option<&str>) -> Result<Self> {
        let options = factory.create_prom_options(name).await?;
        Self::for_root(options)
    }

    /// Declare every metric in `specs`. Fails on the first unsupported kind or
    /// construction error.
    pub fn for_metrics(&self, specs: &[MetricSpec]) -> Result<Vec<Metric>> {
        specs
            .iter()
            .map(|spec| self.provide(spec.kind()?, &spec.configuration))
            .collect()
    }

    pub fn for_counter(&self, cfg: &MetricConfiguration) -> Result<CounterVec> {
        let m = self.provide(MetricKind::Counter, cfg)?;
        m.as_counter().cloned().ok_or_else(|| kind_mismatch(cfg, &m))
    }

    pub fn for_gauge(&self, cfg: &MetricConfiguration) -> Result<GaugeVec> {
        let m = self.provide(MetricKind::Gauge, cfg)?;
        m.as_gauge().cloned().ok_or_else(|| kind_mismatch(cfg, &m))
    }

    pub fn for_histogram(&self, cfg: &MetricConfiguration) -> Result<HistogramVec> {
        let m = self.provide(MetricKind::Histogram, cfg)?;
        m.as_histogram().cloned().ok_or_else(|| kind_mismatch(cfg, &m))
    }

    pub fn for_summary(&self, cfg: &MetricConfiguration) -> Result<SummaryVec> {
        let m = self.provide(MetricKind::Summary, cfg)?;
        m.as_summary().cloned().ok_or_else(|| kind_mismatch(cfg, &m))
    }

    pub fn provide(&self, kind: MetricKind, cfg: &MetricConfiguration) -> Result<Metric> {
        self.inner.providers.metric(kind, cfg, &self.inner.registry)
    }

    /// Previously declared metric of this module's registry.
    pub fn metric(&self, kind: MetricKind, name: &str) -> Option<Metric> {
        self.inner
            .providers
            .get(kind, name, Some(self.inner.registry.name()))
    }

    pub fn options(&self) -> &PromOptions {
        &self.inner.options
    }

    pub fn registry(&self) -> Arc<PromRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn providers(&self) -> Arc<ProviderCache> {
        Arc::clone(&self.inner.providers)
    }

    pub fn http_requests_total(&self) -> &CounterVec {
        &self.inner.http_requests
    }

    /// State for `middleware::inbound::track`.
    pub fn inbound(&self) -> InboundMiddleware {
        InboundMiddleware::new(
            Arc::clone(&self.inner.options),
            self.registry(),
            self.inner.http_requests.clone(),
        )
    }

    pub fn render(&self) -> Result<String> {
        self.inner.registry.render()
    }
}

pub fn http_requests_configuration() -> MetricConfiguration {
    MetricConfiguration::new(METRIC_HTTP_REQUESTS_TOTAL, "Number of inbound requests")
        .with_labels(HTTP_REQUEST_LABELS)
}

fn kind_mismatch(cfg: &MetricConfiguration, got: &Metric) -> PromError {
    PromError::Internal(format!("provider for {} resolved to a {}", cfg.name, got.kind()))
}
