//! Operational HTTP endpoints.
//!
//! - `/healthz`        : liveness
//! - `/<custom_url>`   : Prometheus text format (when `enable_default_endpoint`)

use std::sync::Arc;

use axum::{http::StatusCode, response::{IntoResponse, Response}};

use crate::middleware::inbound::scrape_response;
use crate::obs::PromRegistry;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(registry: Arc<PromRegistry>) -> Response {
    scrape_response(&registry)
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
