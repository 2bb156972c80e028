//! Inbound instrumentation through a real axum router.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use prometheus::core::Collector;
use tower::ServiceExt;

use promkit_server::config::PromOptions;
use promkit_server::module::PromModule;
use promkit_server::router::instrument;

fn module(registry: &str, tweak: impl FnOnce(&mut PromOptions)) -> PromModule {
    let mut options = PromOptions {
        registry_name: Some(registry.to_string()),
        enable_default_metrics: false,
        enable_http_counter_middleware: true,
        ..Default::default()
    };
    tweak(&mut options);
    PromModule::for_root(options).unwrap()
}

fn app(prom: &PromModule) -> Router {
    let routes = Router::new()
        .route("/orders/:id", get(|| async { (StatusCode::CREATED, "created") }))
        .route("/favicon.ico", get(|| async { "icon" }))
        .fallback(|| async { StatusCode::NOT_FOUND });
    instrument(routes, prom)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Option<String>, String) {
    let req = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = res.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

fn total(prom: &PromModule) -> f64 {
    prom.http_requests_total()
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value())
        .sum()
}

fn count(prom: &PromModule, method: &str, status: &str, path: &str) -> f64 {
    prom.http_requests_total()
        .with_label_values(&[method, status, path])
        .get()
}

#[tokio::test]
async fn countable_request_records_status_seen_on_entry() {
    let prom = module("inbound-countable", |_| {});
    let app = app(&prom);

    let (status, _, body) = send(&app, Method::GET, "/orders/42").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, "created");

    assert_eq!(total(&prom), 1.0);
    assert_eq!(count(&prom, "GET", "200", "/orders/42"), 1.0);
}

#[tokio::test]
async fn final_status_is_recorded_when_opted_in() {
    let prom = module("inbound-final-status", |o| o.record_final_status = true);
    let app = app(&prom);

    send(&app, Method::GET, "/orders/42").await;
    send(&app, Method::GET, "/missing").await;

    assert_eq!(count(&prom, "GET", "201", "/orders/42"), 1.0);
    assert_eq!(count(&prom, "GET", "404", "/missing"), 1.0);
    assert_eq!(total(&prom), 2.0);
}

#[tokio::test]
async fn query_string_is_not_part_of_the_path_label() {
    let prom = module("inbound-query", |_| {});
    let app = app(&prom);

    send(&app, Method::POST, "/orders/7?expand=items").await;
    assert_eq!(count(&prom, "POST", "200", "/orders/7"), 1.0);
}

#[tokio::test]
async fn scrape_returns_registry_and_is_not_counted() {
    let prom = module("inbound-scrape", |_| {});
    let app = app(&prom);

    send(&app, Method::GET, "/orders/1").await;
    let (status, content_type, body) = send(&app, Method::GET, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(prom.registry().content_type()));
    assert!(body.contains("# TYPE http_requests_total counter"), "{body}");
    assert!(body.contains("path=\"/orders/1\""));
    assert!(!body.contains("path=\"/metrics\""));
    assert_eq!(total(&prom), 1.0);
}

#[tokio::test]
async fn scrape_answers_any_method() {
    let prom = module("inbound-scrape-method", |_| {});
    let app = app(&prom);

    let (status, content_type, _) = send(&app, Method::POST, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));
    assert_eq!(total(&prom), 0.0);
}

#[tokio::test]
async fn custom_url_moves_the_scrape_path() {
    let prom = module("inbound-custom-url", |o| o.custom_url = Some("internal/prom".into()));
    let app = app(&prom);

    let (status, content_type, _) = send(&app, Method::GET, "/internal/prom").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.is_some());

    let (status, _, _) = send(&app, Method::GET, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(count(&prom, "GET", "200", "/metrics"), 1.0);
    assert_eq!(total(&prom), 1.0);
}

#[tokio::test]
async fn favicon_is_never_counted_nor_scraped() {
    let prom = module("inbound-favicon", |_| {});
    let app = app(&prom);

    let (status, _, body) = send(&app, Method::GET, "/favicon.ico").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "icon");
    assert_eq!(total(&prom), 0.0);
}

#[tokio::test]
async fn disabled_middleware_mutates_nothing() {
    let prom = module("inbound-disabled", |o| o.enable_http_counter_middleware = false);
    let app = app(&prom);

    send(&app, Method::GET, "/orders/1").await;
    let (status, _, body) = send(&app, Method::GET, "/metrics").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body.contains("http_requests_total"));
    assert_eq!(total(&prom), 0.0);
}

#[tokio::test]
async fn default_endpoint_serves_without_counting() {
    let prom = module("inbound-default-endpoint", |o| {
        o.enable_http_counter_middleware = false;
        o.enable_default_endpoint = true;
    });
    let jobs = prom
        .for_counter(&promkit_core::MetricConfiguration::new("jobs_total", "Jobs"))
        .unwrap();
    jobs.with_label_values(&[]).inc();
    let app = app(&prom);

    let (status, content_type, body) = send(&app, Method::GET, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));
    assert!(body.contains("jobs_total 1"), "{body}");
    assert_eq!(total(&prom), 0.0);
}
