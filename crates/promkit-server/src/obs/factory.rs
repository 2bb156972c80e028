//! Metric construction.
//!
//! `create_metric` is a plain constructor: every call builds a new client
//! metric and registers it, so a second call for the same name on the same
//! registry fails with `DuplicateMetric`. Callers that want "construct once,
//! share everywhere" go through `container::ProviderCache`.

use prometheus::core::Collector;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts};
use promkit_core::error::Result;
use promkit_core::{metric_token, MetricConfiguration, MetricKind, MetricSpec};

use super::registry::{client_error, PromRegistry};
use super::summary::{SummaryOpts, SummaryVec};

/// A constructed metric. Cloning yields a handle onto the same storage.
#[derive(Clone)]
pub enum Metric {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
    Summary(SummaryVec),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Summary(_) => MetricKind::Summary,
        }
    }

    pub fn as_counter(&self) -> Option<&CounterVec> {
        match self {
            Metric::Counter(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&GaugeVec> {
        match self {
            Metric::Gauge(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&HistogramVec> {
        match self {
            Metric::Histogram(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_summary(&self) -> Option<&SummaryVec> {
        match self {
            Metric::Summary(m) => Some(m),
            _ => None,
        }
    }

    fn collector(&self) -> Box<dyn Collector> {
        match self {
            Metric::Counter(m) => Box::new(m.clone()),
            Metric::Gauge(m) => Box::new(m.clone()),
            Metric::Histogram(m) => Box::new(m.clone()),
            Metric::Summary(m) => Box::new(m.clone()),
        }
    }
}

impl std::fmt::Debug for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Metric::{}", self.kind())
    }
}

/// Build a metric of `kind` from `cfg` and register it into `registry`.
pub fn create_metric(kind: MetricKind, cfg: &MetricConfiguration, registry: &PromRegistry) -> Result<Metric> {
    cfg.validate(kind)?;

    let name = cfg.name.as_str();
    let labels = cfg.label_refs();
    let const_labels = registry.default_labels();
    let client = |e: prometheus::Error| client_error(name, e);

    let metric = match kind {
        MetricKind::Counter => {
            let opts = Opts::new(name, &cfg.help).const_labels(const_labels);
            Metric::Counter(CounterVec::new(opts, &labels).map_err(client)?)
        }
        MetricKind::Gauge => {
            let opts = Opts::new(name, &cfg.help).const_labels(const_labels);
            Metric::Gauge(GaugeVec::new(opts, &labels).map_err(client)?)
        }
        MetricKind::Histogram => {
            let opts = HistogramOpts::new(name, &cfg.help)
                .const_labels(const_labels)
                .buckets(cfg.buckets_or_default());
            Metric::Histogram(HistogramVec::new(opts, &labels).map_err(client)?)
        }
        MetricKind::Summary => {
            let opts = SummaryOpts {
                name: cfg.name.clone(),
                help: cfg.help.clone(),
                label_names: cfg.label_names.clone(),
                const_labels,
                percentiles: cfg.percentiles_or_default(),
                max_samples: cfg.max_samples_or_default(),
            };
            Metric::Summary(SummaryVec::new(opts).map_err(client)?)
        }
    };

    registry.register(metric.collector(), name)?;
    tracing::debug!(
        token = %metric_token(kind, name),
        registry = registry.name(),
        "metric registered"
    );
    Ok(metric)
}

/// Same as `create_metric` for a config-file declaration; an unknown `type`
/// fails with `UnsupportedMetricKind` before anything is built.
pub fn create_metric_from_spec(spec: &MetricSpec, registry: &PromRegistry) -> Result<Metric> {
    let kind = spec.kind()?;
    create_metric(kind, &spec.configuration, registry)
}
