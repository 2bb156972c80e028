use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use promkit_core::error::{PromError, Result};
use promkit_core::metric::{is_valid_label_name, is_valid_metric_name};
use promkit_core::{registry_name, MetricSpec};

use crate::obs::DefaultMetricsOptions;

/// Scrape path used when `custom_url` is not set.
pub const DEFAULT_METRICS_ENDPOINT: &str = "metrics";

/// Labels carried by `http_requests_total`; default labels may not reuse them.
pub const HTTP_REQUEST_LABELS: [&str; 3] = ["method", "status", "path"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub prom: PromOptions,

    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PromError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.prom.validate()?;

        for spec in &self.metrics {
            let kind = spec.kind()?;
            spec.configuration.validate(kind)?;
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            PromError::InvalidConfiguration(format!("server.listen must be a socket address: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:9100".into()
}

/// Options for one prom module scope. Keys not recognized here are kept in
/// `extra` instead of failing the parse.
#[derive(Debug, Clone, Deserialize)]
pub struct PromOptions {
    /// Attach default runtime metrics to the registry.
    #[serde(default = "default_true")]
    pub enable_default_metrics: bool,

    /// Serve `GET /<custom_url>` as a plain route.
    #[serde(default)]
    pub enable_default_endpoint: bool,

    /// Count inbound requests into `http_requests_total` and answer scrapes
    /// from the middleware.
    #[serde(default)]
    pub enable_http_counter_middleware: bool,

    #[serde(default)]
    pub registry_name: Option<String>,

    /// Default metrics refresh period.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Prefix for default metric names.
    #[serde(default)]
    pub metric_name_prefix: Option<String>,

    #[serde(default)]
    pub default_labels: BTreeMap<String, String>,

    /// Scrape path without the leading slash.
    #[serde(default)]
    pub custom_url: Option<String>,

    /// Record the status after the downstream handler ran instead of the one
    /// seen when the middleware is entered.
    #[serde(default)]
    pub record_final_status: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for PromOptions {
    fn default() -> Self {
        Self {
            enable_default_metrics: true,
            enable_default_endpoint: false,
            enable_http_counter_middleware: false,
            registry_name: None,
            timeout_ms: None,
            metric_name_prefix: None,
            default_labels: BTreeMap::new(),
            custom_url: None,
            record_final_status: false,
            extra: BTreeMap::new(),
        }
    }
}

impl PromOptions {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == Some(0) {
            return Err(invalid("prom.timeout_ms must be greater than 0"));
        }

        if let Some(url) = &self.custom_url {
            let url = url.trim_start_matches('/');
            if url.is_empty() || url.contains(|c: char| c.is_whitespace() || c == '?' || c == '#') {
                return Err(invalid("prom.custom_url must be a non-empty path"));
            }
            if url.contains([':', '*']) {
                return Err(invalid("prom.custom_url must be a literal path without captures"));
            }
        }

        if let Some(prefix) = self.metric_name_prefix.as_deref().filter(|p| !p.is_empty()) {
            if !is_valid_metric_name(prefix) {
                return Err(invalid(&format!("prom.metric_name_prefix is not a valid metric name: {prefix}")));
            }
        }

        for label in self.default_labels.keys() {
            if !is_valid_label_name(label) {
                return Err(invalid(&format!("prom.default_labels: invalid label name {label}")));
            }
            if HTTP_REQUEST_LABELS.contains(&label.as_str()) {
                return Err(invalid(&format!("prom.default_labels: {label} is reserved for http_requests_total")));
            }
        }

        Ok(())
    }

    pub fn registry_name(&self) -> &str {
        registry_name(self.registry_name.as_deref())
    }

    /// Absolute scrape path, e.g. `/metrics`.
    pub fn metrics_path(&self) -> String {
        let url = self
            .custom_url
            .as_deref()
            .map(|u| u.trim_start_matches('/'))
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_METRICS_ENDPOINT);
        format!("/{url}")
    }

    pub fn default_metrics(&self) -> DefaultMetricsOptions {
        DefaultMetricsOptions {
            enabled: self.enable_default_metrics,
            timeout: self.timeout_ms.map(Duration::from_millis),
            prefix: self.metric_name_prefix.clone().filter(|p| !p.is_empty()),
        }
    }
}

fn default_true() -> bool {
    true
}

fn invalid(msg: &str) -> PromError {
    PromError::InvalidConfiguration(msg.to_string())
}
