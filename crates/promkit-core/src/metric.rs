//! Metric kinds and the configuration a metric is constructed from.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{PromError, Result};

/// Default histogram ladder (seconds).
pub const DEFAULT_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Default summary percentiles.
pub const DEFAULT_PERCENTILES: [f64; 7] = [0.01, 0.05, 0.5, 0.9, 0.95, 0.99, 0.999];

/// Default number of recent observations a summary keeps per label set.
pub const DEFAULT_SUMMARY_WINDOW: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Counter,
        MetricKind::Gauge,
        MetricKind::Histogram,
        MetricKind::Summary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = PromError;

    fn from_str(s: &str) -> Result<Self> {
        MetricKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PromError::UnsupportedMetricKind(s.to_string()))
    }
}

/// Name, help, label names and kind-specific parameters of one metric.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricConfiguration {
    pub name: String,
    pub help: String,

    #[serde(default)]
    pub label_names: Vec<String>,

    /// Histogram only. `None` => `DEFAULT_BUCKETS`.
    #[serde(default)]
    pub buckets: Option<Vec<f64>>,

    /// Summary only. `None` => `DEFAULT_PERCENTILES`.
    #[serde(default)]
    pub percentiles: Option<Vec<f64>>,

    /// Summary only. `None` => `DEFAULT_SUMMARY_WINDOW`.
    #[serde(default)]
    pub max_samples: Option<usize>,
}

impl MetricConfiguration {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names: Vec::new(),
            buckets: None,
            percentiles: None,
            max_samples: None,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_names = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = Some(buckets);
        self
    }

    pub fn with_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.percentiles = Some(percentiles);
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    pub fn label_refs(&self) -> Vec<&str> {
        self.label_names.iter().map(String::as_str).collect()
    }

    pub fn buckets_or_default(&self) -> Vec<f64> {
        self.buckets.clone().unwrap_or_else(|| DEFAULT_BUCKETS.to_vec())
    }

    pub fn percentiles_or_default(&self) -> Vec<f64> {
        self.percentiles
            .clone()
            .unwrap_or_else(|| DEFAULT_PERCENTILES.to_vec())
    }

    pub fn max_samples_or_default(&self) -> usize {
        self.max_samples.unwrap_or(DEFAULT_SUMMARY_WINDOW)
    }

    /// Check the configuration against the kind it will be built as.
    pub fn validate(&self, kind: MetricKind) -> Result<()> {
        let name = &self.name;
        if !is_valid_metric_name(name) {
            return Err(invalid(format!("invalid metric name: {name:?}")));
        }
        if self.help.trim().is_empty() {
            return Err(invalid(format!("metric {name}: help must not be empty")));
        }

        let reserved = match kind {
            MetricKind::Histogram => Some("le"),
            MetricKind::Summary => Some("quantile"),
            MetricKind::Counter | MetricKind::Gauge => None,
        };
        for (i, label) in self.label_names.iter().enumerate() {
            if !is_valid_label_name(label) {
                return Err(invalid(format!("metric {name}: invalid label name {label:?}")));
            }
            if Some(label.as_str()) == reserved {
                return Err(invalid(format!("metric {name}: label {label} is reserved for {kind}")));
            }
            if self.label_names[..i].contains(label) {
                return Err(invalid(format!("metric {name}: duplicate label {label}")));
            }
        }

        if kind != MetricKind::Histogram && self.buckets.is_some() {
            return Err(invalid(format!("metric {name}: buckets only apply to histograms")));
        }
        if kind != MetricKind::Summary && (self.percentiles.is_some() || self.max_samples.is_some()) {
            return Err(invalid(format!("metric {name}: percentiles only apply to summaries")));
        }

        if let Some(buckets) = &self.buckets {
            if buckets.is_empty() {
                return Err(invalid(format!("metric {name}: buckets must not be empty")));
            }
            if buckets.iter().any(|b| !b.is_finite() || *b <= 0.0) {
                return Err(invalid(format!("metric {name}: buckets must be positive numbers")));
            }
            if !strictly_ascending(buckets) {
                return Err(invalid(format!("metric {name}: buckets must be in increasing order")));
            }
        }

        if let Some(percentiles) = &self.percentiles {
            if percentiles.is_empty() {
                return Err(invalid(format!("metric {name}: percentiles must not be empty")));
            }
            if percentiles.iter().any(|p| !(*p > 0.0 && *p < 1.0)) {
                return Err(invalid(format!("metric {name}: percentiles must be within (0, 1)")));
            }
            if !strictly_ascending(percentiles) {
                return Err(invalid(format!("metric {name}: percentiles must be in increasing order")));
            }
        }

        if self.max_samples == Some(0) {
            return Err(invalid(format!("metric {name}: max_samples must be at least 1")));
        }

        Ok(())
    }
}

/// One declared metric as it appears in a config file:
/// `{ type: counter, configuration: { ... } }`.
///
/// The kind stays a raw string until `kind()` so an unknown type surfaces as
/// `UnsupportedMetricKind` rather than a parse error.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub configuration: MetricConfiguration,
}

impl MetricSpec {
    pub fn new(kind: MetricKind, configuration: MetricConfiguration) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            configuration,
        }
    }

    pub fn kind(&self) -> Result<MetricKind> {
        self.kind.parse()
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, excluding the reserved `__` prefix.
pub fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn strictly_ascending(v: &[f64]) -> bool {
    v.windows(2).all(|w| w[0] < w[1])
}

fn invalid(msg: String) -> PromError {
    PromError::InvalidConfiguration(msg)
}
