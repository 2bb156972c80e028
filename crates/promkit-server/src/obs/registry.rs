//! Registry resolution.
//!
//! The reserved name (`DEFAULT_PROM_REGISTRY`, or no name at all) maps to the
//! client's process-wide registry (`prometheus::default_registry()`), so
//! metrics registered through the `register_*!` macros share its scrape. Every
//! other name gets a fresh, isolated registry; deduplicating those by name is
//! the provider cache's job.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use prometheus::core::Collector;
use prometheus::{Encoder, Registry, TextEncoder};
use promkit_core::error::{PromError, Result};
use promkit_core::{registry_name, registry_token, DEFAULT_PROM_REGISTRY};

use super::defaults::{DefaultMetricsCollector, DefaultMetricsOptions};

static DEFAULT_REGISTRY: OnceLock<Arc<PromRegistry>> = OnceLock::new();

/// A named metrics registry plus the bookkeeping promkit keeps beside it.
pub struct PromRegistry {
    name: String,
    token: String,
    inner: Registry,
    content_type: String,
    default_labels: RwLock<BTreeMap<String, String>>,
    defaults_attached: AtomicBool,
}

impl PromRegistry {
    /// Create an empty, isolated registry.
    pub fn new(name: &str) -> Self {
        Self::wrap(name, Registry::new())
    }

    fn wrap(name: &str, inner: Registry) -> Self {
        let name = registry_name(Some(name)).to_string();
        Self {
            token: registry_token(&name),
            name,
            inner,
            content_type: TextEncoder::new().format_type().to_string(),
            default_labels: RwLock::new(BTreeMap::new()),
            defaults_attached: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_PROM_REGISTRY
    }

    /// Underlying client registry, for callers registering their own collectors.
    pub fn inner(&self) -> &Registry {
        &self.inner
    }

    /// `Content-Type` of `render()` output.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Labels merged as const labels into every metric created afterwards.
    pub fn set_default_labels(&self, labels: BTreeMap<String, String>) {
        let mut guard = self
            .default_labels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = labels;
    }

    pub fn default_labels(&self) -> HashMap<String, String> {
        self.default_labels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Register a collector, mapping client failures for metric `name`.
    pub fn register(&self, collector: Box<dyn Collector>, name: &str) -> Result<()> {
        self.inner
            .register(collector)
            .map_err(|e| client_error(name, e))
    }

    /// Render every metric in the text exposition format.
    pub fn render(&self) -> Result<String> {
        let families = self.inner.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| PromError::Client(format!("encode failed: {e}")))?;
        String::from_utf8(buf).map_err(|e| PromError::Internal(format!("non-utf8 exposition: {e}")))
    }

    pub fn has_default_metrics(&self) -> bool {
        self.defaults_attached.load(Ordering::Acquire)
    }

    /// Attach default runtime metrics. Only the first call per registry does
    /// anything; failures are logged and leave the registry usable.
    pub fn attach_default_metrics(&self, opts: &DefaultMetricsOptions) {
        if !opts.enabled {
            return;
        }
        if self.defaults_attached.swap(true, Ordering::AcqRel) {
            tracing::debug!(registry = %self.name, "default metrics already attached");
            return;
        }

        // the client's global registry already carries its process collector
        let with_process = !self.is_default();
        let attached = DefaultMetricsCollector::new(opts, with_process)
            .and_then(|c| self.register(Box::new(c), "default metrics"));
        match attached {
            Ok(()) => tracing::debug!(
                registry = %self.name,
                prefix = opts.prefix.as_deref().unwrap_or(""),
                refresh = ?opts.timeout,
                "default metrics attached"
            ),
            Err(e) => {
                self.defaults_attached.store(false, Ordering::Release);
                tracing::warn!(registry = %self.name, error = %e, "default metrics not attached");
            }
        }
    }
}

impl std::fmt::Debug for PromRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromRegistry")
            .field("name", &self.name)
            .field("defaults_attached", &self.has_default_metrics())
            .finish()
    }
}

/// The process-wide default registry: a handle onto the client's global one.
pub fn default_registry() -> Arc<PromRegistry> {
    let registry = DEFAULT_REGISTRY.get_or_init(|| {
        tracing::debug!("wrapping client default registry");
        Arc::new(PromRegistry::wrap(
            DEFAULT_PROM_REGISTRY,
            prometheus::default_registry().clone(),
        ))
    });
    Arc::clone(registry)
}

/// Resolve a registry by name and attach default metrics to it when enabled.
/// Never fails.
pub fn resolve(name: Option<&str>, defaults: &DefaultMetricsOptions) -> Arc<PromRegistry> {
    let name = registry_name(name);
    let registry = if name == DEFAULT_PROM_REGISTRY {
        default_registry()
    } else {
        tracing::debug!(registry = %name, "creating isolated registry");
        Arc::new(PromRegistry::new(name))
    };
    registry.attach_default_metrics(defaults);
    registry
}

pub(crate) fn client_error(name: &str, e: prometheus::Error) -> PromError {
    match e {
        prometheus::Error::AlreadyReg => PromError::DuplicateMetric(name.to_string()),
        prometheus::Error::Msg(msg) if msg.contains("same fully-qualified name") => {
            PromError::DuplicateMetric(format!("{name}: {msg}"))
        }
        other => PromError::Client(format!("{name}: {other}")),
    }
}
