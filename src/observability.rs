//! Observability setup: structured logging, Prometheus metrics, OTLP trace
//! export and the status server.

pub mod health_checks;
pub mod metrics;
pub mod tracing_mod;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use opentelemetry_sdk::trace::SdkTracerProvider;
use sqlx::PgPool;

use crate::observability_config::ObservabilityConfig;

pub use self::health_checks::{
    check_database_health, check_ocr_health, perform_readiness_checks,
    start_health_metrics_recorder,
};
pub use self::metrics::{
    init_metrics_with_config, record_db_metrics, record_health_check_metrics, record_ocr_metrics,
    record_pipeline_metrics, record_remote_call_metrics, record_request_metrics,
    start_metrics_server, StatusContext,
};
pub use self::tracing_mod::{
    db_span, http_span, init_opentelemetry_tracing_with_config, init_tracing_with_config,
    pipeline_span,
};

/// Keeps the trace exporter alive; flush it on shutdown.
#[derive(Default)]
pub struct ObservabilityGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl ObservabilityGuard {
    pub fn shutdown(self) {
        if let Some(provider) = self.tracer_provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Failed to flush trace exporter");
            }
        }
    }
}

/// Logging must come up before anything else logs.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;
    init_tracing_with_config(config)
}

/// Metrics recorder, OTLP export and the status server with readiness checks
/// against the database and the OCR engine.
pub async fn init_observability_with_health_checks(
    config: &ObservabilityConfig,
    db_pool: Option<Arc<PgPool>>,
    ocr_languages: &str,
) -> Result<ObservabilityGuard> {
    let metrics_handle = init_metrics_with_config(config)?;
    let tracer_provider = init_opentelemetry_tracing_with_config(config)?;

    let context = StatusContext {
        metrics_handle,
        db_pool: db_pool.clone(),
        ocr_languages: ocr_languages.to_string(),
    };
    start_metrics_server(context, SocketAddr::from(([0, 0, 0, 0], config.metrics_port))).await?;

    tracing::info!(
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        metrics_port = %config.metrics_port,
        has_db_pool = %db_pool.is_some(),
        "Observability stack initialized"
    );
    Ok(ObservabilityGuard { tracer_provider })
}
