#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use promkit_core::error::ErrorCode;
use promkit_server::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:9100"
  lisen: "typo"
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "INVALID_CONFIGURATION");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert!(cfg.prom.enable_default_metrics);
    assert!(!cfg.prom.enable_http_counter_middleware);
    assert!(!cfg.prom.enable_default_endpoint);
    assert_eq!(cfg.prom.registry_name(), "default");
    assert_eq!(cfg.prom.metrics_path(), "/metrics");
    assert!(cfg.metrics.is_empty());
}

#[test]
fn unknown_prom_keys_are_kept_aside() {
    let ok = r#"
version: 1
prom:
  enable_http_counter_middleware: true
  custom_url: internal/metrics
  collect_gc: true
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert!(cfg.prom.enable_http_counter_middleware);
    assert_eq!(cfg.prom.metrics_path(), "/internal/metrics");
    assert_eq!(cfg.prom.extra.get("collect_gc"), Some(&serde_yaml::Value::Bool(true)));
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2").expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::UnsupportedVersion);
}

#[test]
fn bad_listen_address() {
    let bad = r#"
version: 1
server: { listen: "nowhere" }
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::InvalidConfiguration);
}

#[test]
fn unsupported_metric_type_fails_at_load() {
    let bad = r#"
version: 1
metrics:
  - type: meter
    configuration: { name: ticks, help: Ticks }
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::UnsupportedMetricKind);
}

#[test]
fn invalid_buckets_fail_at_load() {
    let bad = r#"
version: 1
metrics:
  - type: histogram
    configuration: { name: latency, help: Latency, buckets: [1, 0.5] }
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::InvalidConfiguration);
}

#[test]
fn app_state_keeps_loaded_config() {
    let ok = r#"
version: 1
server:
  listen: "127.0.0.1:9191"
prom:
  registry_name: app-state-scope
  enable_default_metrics: false
metrics:
  - type: gauge
    configuration:
      name: queue_depth
      help: Queue depth
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    let state = promkit_server::app_state::AppState::new(cfg).expect("must build");
    assert_eq!(state.cfg().server.listen_addr().unwrap().port(), 9191);
    assert_eq!(state.prom().registry().name(), "app-state-scope");
    assert!(state
        .prom()
        .metric(promkit_core::MetricKind::Gauge, "queue_depth")
        .is_some());
}
