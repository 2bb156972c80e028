//! Inbound request instrumentation.
//!
//! Every request is classified once, in this order:
//! 1. `Disabled`  - counter middleware turned off: pass through.
//! 2. `Scrape`    - path equals the metrics path: answer with the rendered
//!    registry, the rest of the chain is not run.
//! 3. `Ignored`   - favicon: pass through.
//! 4. `Countable` - increment `http_requests_total{method,status,path}`, then
//!    pass through.
//!
//! The `status` label is read when the middleware is entered, before the
//! downstream handler has produced a response, so it is the initial `200`.
//! `record_final_status` moves the observation after the handler instead.

use std::sync::Arc;
use std::time::SystemTime;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::CounterVec;

use crate::config::PromOptions;
use crate::obs::PromRegistry;

pub const FAVICON_PATH: &str = "/favicon.ico";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundAction {
    Disabled,
    Scrape,
    Ignored,
    Countable,
}

/// Classify `path` under `options`.
pub fn classify(options: &PromOptions, path: &str) -> InboundAction {
    decide(
        options.enable_http_counter_middleware,
        &options.metrics_path(),
        path,
    )
}

fn decide(enabled: bool, metrics_path: &str, path: &str) -> InboundAction {
    if !enabled {
        InboundAction::Disabled
    } else if path == metrics_path {
        InboundAction::Scrape
    } else if path == FAVICON_PATH {
        InboundAction::Ignored
    } else {
        InboundAction::Countable
    }
}

/// What the counter sees of one request.
#[derive(Debug, Clone)]
pub struct InboundRecord {
    pub method: String,
    pub path: String,
    pub status: StatusCode,
    pub timestamp: SystemTime,
}

impl InboundRecord {
    pub fn new(method: impl Into<String>, path: impl Into<String>, status: StatusCode) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status,
            timestamp: SystemTime::now(),
        }
    }
}

/// Middleware state: options, the registry to scrape, the request counter.
#[derive(Clone)]
pub struct InboundMiddleware {
    options: Arc<PromOptions>,
    registry: Arc<PromRegistry>,
    counter: CounterVec,
    metrics_path: Arc<str>,
}

impl InboundMiddleware {
    pub fn new(options: Arc<PromOptions>, registry: Arc<PromRegistry>, counter: CounterVec) -> Self {
        let metrics_path = Arc::from(options.metrics_path());
        Self {
            options,
            registry,
            counter,
            metrics_path,
        }
    }

    pub fn classify(&self, path: &str) -> InboundAction {
        decide(
            self.options.enable_http_counter_middleware,
            &self.metrics_path,
            path,
        )
    }

    pub fn observe(&self, record: &InboundRecord) {
        let status = record.status.as_u16().to_string();
        self.counter
            .with_label_values(&[record.method.as_str(), status.as_str(), record.path.as_str()])
            .inc();
        tracing::trace!(
            method = %record.method,
            status = %status,
            path = %record.path,
            at = ?record.timestamp,
            "inbound request counted"
        );
    }
}

/// `axum::middleware::from_fn_with_state` entry point.
pub async fn track(State(mw): State<InboundMiddleware>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    match mw.classify(&path) {
        InboundAction::Disabled | InboundAction::Ignored => next.run(req).await,
        InboundAction::Scrape => scrape_response(&mw.registry),
        InboundAction::Countable => {
            let method = req.method().to_string();
            if mw.options.record_final_status {
                let res = next.run(req).await;
                mw.observe(&InboundRecord::new(method, path, res.status()));
                res
            } else {
                // no response exists yet
                mw.observe(&InboundRecord::new(method, path, StatusCode::OK));
                next.run(req).await
            }
        }
    }
}

/// Render `registry` as an HTTP response. Encoding failures become a 500.
pub fn scrape_response(registry: &PromRegistry) -> Response {
    match registry.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, registry.content_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(registry = registry.name(), error = %e, "metrics render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}
