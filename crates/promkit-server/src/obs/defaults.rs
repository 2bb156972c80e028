//! Default runtime metrics.
//!
//! On Linux this is the client's process collector (cpu, memory, fds, threads,
//! start time), left out where the registry already has one. Every platform
//! also gets `promkit_info{version}`. An optional
//! refresh period caches gathered families; between refreshes scrapes see the
//! previous values.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};
use promkit_core::error::{PromError, Result};

#[cfg(target_os = "linux")]
use prometheus::process_collector::ProcessCollector;

const INFO_NAME: &str = "promkit_info";

/// How default metrics are wired into a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultMetricsOptions {
    pub enabled: bool,
    /// Refresh period. `None` gathers on every scrape.
    pub timeout: Option<Duration>,
    /// Prepended to every default metric name.
    pub prefix: Option<String>,
}

impl Default for DefaultMetricsOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: None,
            prefix: None,
        }
    }
}

impl DefaultMetricsOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Namespace handed to the client: `app_` and `app` both yield `app_<name>`.
    fn namespace(&self) -> String {
        self.prefix
            .as_deref()
            .map(|p| p.trim_end_matches('_'))
            .unwrap_or_default()
            .to_string()
    }
}

pub struct DefaultMetricsCollector {
    info: Gauge,
    #[cfg(target_os = "linux")]
    process: Option<ProcessCollector>,
    refresh: Option<Duration>,
    cache: Mutex<Option<(Instant, Vec<MetricFamily>)>>,
}

impl DefaultMetricsCollector {
    #[cfg_attr(not(target_os = "linux"), allow(unused_variables))]
    pub fn new(opts: &DefaultMetricsOptions, with_process: bool) -> Result<Self> {
        let namespace = opts.namespace();
        let info = Gauge::with_opts(
            Opts::new(INFO_NAME, "promkit build information")
                .namespace(namespace.clone())
                .const_label("version", env!("CARGO_PKG_VERSION")),
        )
        .map_err(|e| PromError::Client(format!("{INFO_NAME}: {e}")))?;
        info.set(1.0);

        Ok(Self {
            info,
            #[cfg(target_os = "linux")]
            process: with_process.then(|| ProcessCollector::new(std::process::id() as i32, namespace)),
            refresh: opts.timeout.filter(|d| !d.is_zero()),
            cache: Mutex::new(None),
        })
    }

    fn gather_live(&self) -> Vec<MetricFamily> {
        #[allow(unused_mut)]
        let mut families = self.info.collect();
        #[cfg(target_os = "linux")]
        if let Some(process) = &self.process {
            families.extend(process.collect());
        }
        families
    }
}

impl Collector for DefaultMetricsCollector {
    fn desc(&self) -> Vec<&Desc> {
        #[allow(unused_mut)]
        let mut descs = self.info.desc();
        #[cfg(target_os = "linux")]
        if let Some(process) = &self.process {
            descs.extend(process.desc());
        }
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let Some(period) = self.refresh else {
            return self.gather_live();
        };

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((at, families)) = cache.as_ref() {
            if at.elapsed() < period {
                return families.clone();
            }
        }
        let families = self.gather_live();
        *cache = Some((Instant::now(), families.clone()));
        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(families: &[MetricFamily]) -> Vec<String> {
        families.iter().map(|f| f.get_name().to_string()).collect()
    }

    #[test]
    fn info_gauge_is_always_present() {
        let c = DefaultMetricsCollector::new(&DefaultMetricsOptions::default(), true).unwrap();
        assert!(names(&c.collect()).contains(&"promkit_info".to_string()));
    }

    #[test]
    fn process_families_can_be_left_out() {
        let c = DefaultMetricsCollector::new(&DefaultMetricsOptions::default(), false).unwrap();
        assert_eq!(names(&c.collect()), vec!["promkit_info".to_string()]);
    }

    #[test]
    fn prefix_trailing_underscore_is_normalized() {
        for prefix in ["app", "app_"] {
            let opts = DefaultMetricsOptions {
                prefix: Some(prefix.to_string()),
                ..Default::default()
            };
            let c = DefaultMetricsCollector::new(&opts, true).unwrap();
            let names = names(&c.collect());
            assert!(names.contains(&"app_promkit_info".to_string()), "{names:?}");
            assert!(names.iter().all(|n| n.starts_with("app_")));
        }
    }

    #[test]
    fn invalid_prefix_is_rejected() {
        let opts = DefaultMetricsOptions {
            prefix: Some("bad-prefix".to_string()),
            ..Default::default()
        };
        assert!(DefaultMetricsCollector::new(&opts, true).is_err());
    }

    #[test]
    fn refresh_period_serves_cached_families() {
        let opts = DefaultMetricsOptions {
            timeout: Some(Duration::from_secs(3600)),
            ..Default::default()
        };
        let c = DefaultMetricsCollector::new(&opts, true).unwrap();
        let first = c.collect();
        c.info.set(7.0);
        let second = c.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn without_refresh_every_collect_is_live() {
        let c = DefaultMetricsCollector::new(&DefaultMetricsOptions::default(), true).unwrap();
        c.collect();
        c.info.set(7.0);
        let info = c
            .collect()
            .into_iter()
            .find(|f| f.get_name() == "promkit_info")
            .unwrap();
        assert_eq!(info.get_metric()[0].get_gauge().get_value(), 7.0);
    }
}
