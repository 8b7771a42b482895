//! Prometheus export and metric recording.
//!
//! The exporter server is a bare `hyper` http1 loop serving `/metrics`,
//! `/health/live` and `/health/ready`, with a per-IP rate limit and an
//! optional bearer token (`METRICS_AUTH_TOKEN`).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::observability_config::ObservabilityConfig;

/// Sliding-window request counter keyed by client IP
#[derive(Debug)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn is_allowed(&self, ip: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.lock();
        let client_requests = requests.entry(ip.to_string()).or_default();

        client_requests.retain(|&time| now.duration_since(time) < self.window);
        if client_requests.len() >= self.max_requests as usize {
            return false;
        }
        client_requests.push(now);
        true
    }
}

/// No token configured means the endpoints are open.
fn is_authorized(headers: &hyper::HeaderMap, expected_token: Option<&str>) -> bool {
    let Some(expected) = expected_token else {
        return true;
    };
    headers
        .get(hyper::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}

/// Install the Prometheus recorder. `None` when export is disabled.
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enable_metrics_export {
        tracing::info!("Metrics export disabled");
        return Ok(None);
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Metrics collection initialized");
    Ok(Some(handle))
}

/// Everything the exporter needs to answer a status request.
#[derive(Clone)]
pub struct StatusContext {
    pub metrics_handle: Option<PrometheusHandle>,
    pub db_pool: Option<Arc<PgPool>>,
    pub ocr_languages: String,
}

pub async fn start_metrics_server(context: StatusContext, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let rate_limiter = Arc::new(RateLimiter::new(60, 60));
    let auth_token = std::env::var("METRICS_AUTH_TOKEN")
        .ok()
        .filter(|token| !token.is_empty());
    tracing::info!(%addr, auth = auth_token.is_some(), "Metrics server listening");

    tokio::spawn(async move {
        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, %addr, "Error accepting metrics connection");
                    continue;
                }
            };

            let context = context.clone();
            let rate_limiter = rate_limiter.clone();
            let auth_token = auth_token.clone();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = hyper::service::service_fn(
                    move |req: hyper::Request<hyper::body::Incoming>| {
                        let context = context.clone();
                        let allowed = rate_limiter.is_allowed(&peer_addr.ip().to_string());
                        let authorized = is_authorized(req.headers(), auth_token.as_deref());
                        async move {
                            let (status, body) = if !allowed {
                                (hyper::StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string())
                            } else if !authorized {
                                (hyper::StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
                            } else {
                                route_status(&context, req.method(), req.uri().path()).await
                            };
                            let mut response = hyper::Response::new(body);
                            *response.status_mut() = status;
                            Ok::<_, std::convert::Infallible>(response)
                        }
                    },
                );

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::warn!(error = %err, peer = %peer_addr, "Error serving metrics connection");
                }
            });
        }
    });

    Ok(())
}

async fn route_status(
    context: &StatusContext,
    method: &hyper::Method,
    path: &str,
) -> (hyper::StatusCode, String) {
    if method != hyper::Method::GET {
        return (hyper::StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string());
    }
    match path {
        "/metrics" => match &context.metrics_handle {
            Some(handle) => (hyper::StatusCode::OK, handle.render()),
            None => (hyper::StatusCode::NOT_FOUND, "Metrics export disabled".to_string()),
        },
        "/health/live" => (hyper::StatusCode::OK, "OK".to_string()),
        "/health/ready" => {
            match super::health_checks::perform_readiness_checks(
                context.db_pool.as_deref(),
                &context.ocr_languages,
            )
            .await
            {
                Ok(()) => (hyper::StatusCode::OK, "OK".to_string()),
                Err(e) => (
                    hyper::StatusCode::SERVICE_UNAVAILABLE,
                    format!("NOT READY: {}", e),
                ),
            }
        }
        _ => (hyper::StatusCode::NOT_FOUND, "Not Found".to_string()),
    }
}

fn result_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// One OCR engine invocation
pub fn record_ocr_metrics(success: bool, duration: Duration) {
    metrics::counter!("ocr_operations_total", "result" => result_label(success)).increment(1);
    metrics::histogram!("ocr_duration_seconds").record(duration.as_secs_f64());
}

/// One label scored end to end; `source` is `ocr` or `llm`.
pub fn record_pipeline_metrics(source: &str, success: bool, duration: Duration) {
    let source = source.to_string();
    metrics::counter!(
        "label_pipeline_runs_total",
        "source" => source.clone(),
        "result" => result_label(success)
    )
    .increment(1);
    metrics::histogram!("label_pipeline_duration_seconds", "source" => source)
        .record(duration.as_secs_f64());
}

/// One call to a remote analysis service, e.g. `skin_analysis_requests_total`.
pub fn record_remote_call_metrics(service: &str, outcome: &str, duration: Duration) {
    let outcome = outcome.to_string();
    metrics::counter!(format!("{}_requests_total", service), "outcome" => outcome).increment(1);
    metrics::histogram!(format!("{}_duration_seconds", service)).record(duration.as_secs_f64());
}

pub fn record_db_metrics(operation: &str, success: bool, duration: Duration) {
    let operation = operation.to_string();
    metrics::counter!(
        "db_operations_total",
        "operation" => operation.clone(),
        "result" => result_label(success)
    )
    .increment(1);
    metrics::histogram!("db_operation_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

pub fn record_request_metrics(method: &str, route: &str, status: u16, duration: Duration) {
    let method = method.to_string();
    let route = route.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method,
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "route" => route)
        .record(duration.as_secs_f64());
}

pub fn record_health_check_metrics(check: &str, success: bool, duration: Duration) {
    let check = check.to_string();
    metrics::gauge!("health_check_status", "check" => check.clone())
        .set(if success { 1.0 } else { 0.0 });
    metrics::histogram!("health_check_duration_seconds", "check" => check)
        .record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_window() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(!limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.2"));
    }

    #[test]
    fn test_authorization_header() {
        let mut headers = hyper::HeaderMap::new();
        assert!(is_authorized(&headers, None));
        assert!(!is_authorized(&headers, Some("secret")));

        headers.insert(
            hyper::header::AUTHORIZATION,
            hyper::header::HeaderValue::from_static("Bearer secret"),
        );
        assert!(is_authorized(&headers, Some("secret")));
        assert!(!is_authorized(&headers, Some("other")));
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        record_ocr_metrics(true, Duration::from_millis(5));
        record_pipeline_metrics("ocr", false, Duration::from_millis(5));
        record_remote_call_metrics("skin_analysis", "timeout", Duration::from_secs(1));
        record_db_metrics("create_entry", true, Duration::from_millis(2));
        record_request_metrics("GET", "/skincare/entries", 200, Duration::from_millis(3));
        record_health_check_metrics("ocr", true, Duration::from_millis(1));
    }
}
