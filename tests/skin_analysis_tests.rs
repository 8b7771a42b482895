//! Remote client tests against a local stand-in for the providers.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{Multipart, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use skin_journal::config::{LabelReaderConfig, SkinAnalysisConfig};
use skin_journal::label_reader::{GeminiLabelReader, LabelReader};
use skin_journal::pipeline_errors::PipelineError;
use skin_journal::skin_analysis::{summarize_analysis, AiLabToolsClient, SkinAnalyzer};

use test_helpers::label_png;

async fn analyze_ok(headers: HeaderMap, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    if headers.get("ailabapi-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })));
    }
    let mut image_len = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            image_len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        }
    }
    if image_len == 0 {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "no image" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "result": {
                "skin_type": { "skin_type": 1 },
                "acne": { "value": 1 },
                "pores_left_cheek": { "value": 1 }
            }
        })),
    )
}

async fn analyze_fails() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "provider down")
}

async fn analyze_slowly() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "result": {} }))
}

async fn generate_content(Path(call): Path<String>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if call != "gemini-test:generateContent" || headers.get("x-goog-api-key").is_none() {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Water, Glycerin,  Fragrance (Parfum)\n" }] }
            }]
        })),
    )
}

async fn spawn_provider() -> SocketAddr {
    let app = Router::new()
        .route("/analyze", post(analyze_ok))
        .route("/broken", post(analyze_fails))
        .route("/slow", post(analyze_slowly))
        .route("/models/:call", post(generate_content));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, path: &str, timeout_secs: u64) -> AiLabToolsClient {
    AiLabToolsClient::new(&SkinAnalysisConfig {
        enabled: true,
        api_url: format!("http://{}{}", addr, path),
        api_key: Some("test-key".to_string()),
        timeout_secs,
    })
    .unwrap()
}

#[tokio::test]
async fn test_successful_analysis_summarizes() {
    let addr = spawn_provider().await;
    let result = client(addr, "/analyze", 5)
        .analyze(label_png(), "face.png", "image/png")
        .await
        .unwrap();

    assert_eq!(
        summarize_analysis(&result),
        "Skin Type: Dry | Detected: Acne | Visible pores on: left cheek"
    );
}

#[tokio::test]
async fn test_non_success_status_is_upstream_error() {
    let addr = spawn_provider().await;
    let err = client(addr, "/broken", 5)
        .analyze(label_png(), "face.png", "image/png")
        .await
        .unwrap_err();

    match err {
        PipelineError::Upstream { status, body, .. } => {
            assert_eq!(status, Some(503));
            assert_eq!(body, "provider down");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_provider_is_timeout_not_upstream() {
    let addr = spawn_provider().await;
    let err = client(addr, "/slow", 1)
        .analyze(label_png(), "face.png", "image/png")
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
}

#[tokio::test]
async fn test_unreachable_provider_has_no_status() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, "/analyze", 2)
        .analyze(label_png(), "face.png", "image/png")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Upstream { status: None, .. }));
}

#[test]
fn test_missing_key_is_config_error() {
    let config = SkinAnalysisConfig {
        enabled: true,
        api_key: None,
        ..SkinAnalysisConfig::default()
    };
    assert!(AiLabToolsClient::new(&config).is_err());
}

#[tokio::test]
async fn test_label_reader_splits_model_answer() {
    let addr = spawn_provider().await;
    let reader = GeminiLabelReader::from_config(&LabelReaderConfig {
        api_key: Some("gemini-key".to_string()),
        model: "gemini-test".to_string(),
        base_url: Some(format!("http://{}/models", addr)),
        timeout_secs: 5,
    })
    .unwrap()
    .expect("reader enabled with a key");

    let items = reader.read_ingredients(&label_png(), "image/png").await.unwrap();
    assert_eq!(items, vec!["water", "glycerin", "fragrance (parfum)"]);
}

#[test]
fn test_label_reader_disabled_without_key() {
    let reader = GeminiLabelReader::from_config(&LabelReaderConfig::default()).unwrap();
    assert!(reader.is_none());
}
