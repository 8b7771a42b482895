//! # Observability Tests Module
//!
//! Metric recording, spans, configuration presets and the status server.
//! Global subscriber and recorder installation is left out so tests do not
//! fight over process-wide state.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use skin_journal::observability::{self, StatusContext};
use skin_journal::observability_config::{presets, ObservabilityConfig};

async fn free_local_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Recording without an installed recorder must be a no-op, not a panic
#[test]
fn test_metrics_recording_without_recorder() {
    observability::record_ocr_metrics(true, Duration::from_millis(120));
    observability::record_pipeline_metrics("ocr", false, Duration::from_millis(300));
    observability::record_remote_call_metrics("skin_analysis", "timeout", Duration::from_secs(60));
    observability::record_db_metrics("create_entry", true, Duration::from_millis(4));
    observability::record_request_metrics("GET", "/health", 200, Duration::from_millis(1));
    observability::record_health_check_metrics("database", false, Duration::from_millis(2));
}

#[test]
fn test_span_creation() {
    let pipeline = observability::pipeline_span("label_analyze");
    let db = observability::db_span("list_entries_in_range", "skincare_entries");
    let http = observability::http_span("GET", "/skincare/analytics/overview");

    let _p = pipeline.enter();
    let _d = db.enter();
    let _h = http.enter();
}

#[test]
fn test_presets_validate() {
    assert!(presets::development().validate().is_ok());
    assert!(presets::production().validate().is_ok());
    assert!(presets::production().is_production());
}

#[test]
fn test_bad_endpoint_rejected() {
    let config = ObservabilityConfig {
        otlp_endpoint: Some("grpc-collector:4317".to_string()),
        ..ObservabilityConfig::default()
    };
    assert!(config.validate().is_err());
    assert!(observability::init_logging(&config).is_err());
}

#[tokio::test]
async fn test_status_server_routes() {
    let addr = free_local_addr().await;
    let context = StatusContext {
        metrics_handle: Some(PrometheusBuilder::new().build_recorder().handle()),
        db_pool: None,
        ocr_languages: "eng".to_string(),
    };
    observability::start_metrics_server(context, addr).await.unwrap();

    let client = reqwest::Client::new();
    let live = client
        .get(format!("http://{}/health/live", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(live.status(), 200);
    assert_eq!(live.text().await.unwrap(), "OK");

    let metrics = client.get(format!("http://{}/metrics", addr)).send().await.unwrap();
    assert_eq!(metrics.status(), 200);

    let missing = client.get(format!("http://{}/nope", addr)).send().await.unwrap();
    assert_eq!(missing.status(), 404);

    let post = client.post(format!("http://{}/metrics", addr)).send().await.unwrap();
    assert_eq!(post.status(), 405);
}

#[tokio::test]
async fn test_status_server_without_metrics_export() {
    let addr = free_local_addr().await;
    let context = StatusContext {
        metrics_handle: None,
        db_pool: None,
        ocr_languages: "eng".to_string(),
    };
    observability::start_metrics_server(context, addr).await.unwrap();

    let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_health_metrics_recorder_runs() {
    let handle = observability::start_health_metrics_recorder(
        None,
        "eng".to_string(),
        Duration::from_millis(20),
    );
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!handle.is_finished());
    handle.abort();
}
