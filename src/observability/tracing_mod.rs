//! Structured logging, OpenTelemetry export and span helpers.

use anyhow::Result;
use opentelemetry::global;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::prelude::*;

use crate::observability_config::ObservabilityConfig;

/// Install the global subscriber: pretty output in development or when
/// `LOG_FORMAT=pretty`, JSON otherwise.
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("skin_journal={}", config.log_level).parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    let pretty = config.is_development()
        || std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()) == "pretty";

    if pretty {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        pretty,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Export spans over OTLP when an endpoint is configured. Returns the
/// provider so the caller can flush it on shutdown.
pub fn init_opentelemetry_tracing_with_config(
    config: &ObservabilityConfig,
) -> Result<Option<SdkTracerProvider>> {
    let Some(endpoint) = &config.otlp_endpoint else {
        tracing::info!("OpenTelemetry tracing disabled (no OTLP endpoint configured)");
        return Ok(None);
    };

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;

    let resource = Resource::builder()
        .with_service_name("skin-journal")
        .with_attributes(
            config
                .tags
                .iter()
                .map(|(key, value)| KeyValue::new(key.clone(), value.clone())),
        )
        .build();

    let tracer_provider = SdkTracerProvider::builder()
        .with_sampler(Sampler::TraceIdRatioBased(config.effective_sampling_ratio()))
        .with_resource(resource)
        .with_batch_exporter(otlp_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    tracing::info!(
        otlp_endpoint = %endpoint,
        trace_sampling_enabled = %config.enable_trace_sampling,
        trace_sampling_ratio = %config.effective_sampling_ratio(),
        "OpenTelemetry tracing initialized with OTLP export"
    );
    Ok(Some(tracer_provider))
}

/// Span for a label pipeline stage or remote analysis call
pub fn pipeline_span(operation: &str) -> tracing::Span {
    tracing::info_span!("pipeline_operation", operation = operation, component = "pipeline")
}

/// Span for database operations
pub fn db_span(operation: &str, table: &str) -> tracing::Span {
    tracing::info_span!(
        "db_operation",
        operation = operation,
        table = table,
        component = "database"
    )
}

/// Span for one HTTP request
pub fn http_span(method: &str, path: &str) -> tracing::Span {
    tracing::info_span!(
        "http_request",
        method = method,
        path = path,
        user_id = tracing::field::Empty,
        component = "http"
    )
}
