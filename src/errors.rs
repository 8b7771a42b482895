//! # Application Error Types
//!
//! This module defines the error types shared by the HTTP layer, the
//! persistence layer and the startup code. Pipeline-level failures live in
//! [`crate::pipeline_errors`] and are folded into [`AppError::Pipeline`].

use std::fmt;

use crate::pipeline_errors::PipelineError;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (entry payloads, dates, windows, uploads)
    Validation(String),
    /// Requested record does not exist for this user
    NotFound(String),
    /// Record already exists (one entry per user and date)
    Conflict(String),
    /// Database operation errors
    Database(String),
    /// Label pipeline, OCR or remote analysis failures
    Pipeline(PipelineError),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::NotFound(msg) => write!(f, "[NOT_FOUND] {}", msg),
            AppError::Conflict(msg) => write!(f, "[CONFLICT] {}", msg),
            AppError::Database(msg) => write!(f, "[DATABASE] {}", msg),
            AppError::Pipeline(err) => write!(f, "{}", err),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Text safe to show a client. Server-side failures are not echoed back.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::Pipeline(PipelineError::Engine(_)) => "Text recognition failed".to_string(),
            AppError::Pipeline(err) => err.to_string(),
            AppError::Config(msg) => msg.clone(),
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<sqlx::Error>().is_some() {
            AppError::Database(format!("{:#}", err))
        } else {
            AppError::Internal(format!("{:#}", err))
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(msg) => AppError::Validation(msg),
            other => AppError::Pipeline(other),
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::{error, warn};

    /// Log database operation errors with contextual information
    pub fn log_database_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: Option<i64>,
        additional_context: Option<&[(&str, &dyn std::fmt::Display)]>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            user_id = ?user_id,
            additional_context = ?additional_context.map(|ctx| ctx.iter().map(|(k,v)| format!("{}={}", k, v)).collect::<Vec<_>>().join(", ")),
            "Database operation failed"
        );
    }

    /// Log label pipeline errors with image and timing context
    pub fn log_pipeline_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: Option<i64>,
        image_size: Option<usize>,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            user_id = ?user_id,
            image_size_bytes = ?image_size,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "Label pipeline failed"
        );
    }

    /// Log failures talking to a remote service (skin analysis, label reader)
    pub fn log_upstream_error(
        error: &impl std::fmt::Display,
        service: &str,
        endpoint: Option<&str>,
        status: Option<u16>,
    ) {
        error!(
            error = %error,
            service = %service,
            endpoint = ?endpoint,
            status = ?status,
            "Remote service call failed"
        );
    }

    /// Log file system errors with path and operation context
    pub fn log_filesystem_error(
        error: &impl std::fmt::Display,
        operation: &str,
        path: Option<&str>,
        file_size: Option<u64>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            path = ?path,
            file_size_bytes = ?file_size,
            "File system operation failed"
        );
    }

    /// Longest slice of a rejected value that is written to the log
    const MAX_LOGGED_VALUE_CHARS: usize = 100;

    /// Log a rejected request field. Warn level: the caller sent bad input,
    /// the service is fine.
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        field: &str,
        value: Option<&str>,
    ) {
        warn!(
            error = %error,
            operation = %operation,
            field = %field,
            value = ?value.map(|v| v.chars().take(MAX_LOGGED_VALUE_CHARS).collect::<String>()),
            "Request rejected by validation"
        );
    }

    /// Log a server-side failure that has no more specific category, such as
    /// storing an upload
    pub fn log_internal_error(
        error: &impl std::fmt::Display,
        component: &str,
        operation: &str,
        user_id: Option<i64>,
        entry_id: Option<i64>,
    ) {
        error!(
            error = %error,
            component = %component,
            operation = %operation,
            user_id = ?user_id,
            entry_id = ?entry_id,
            "Internal error while handling request"
        );
    }

    /// Log a startup failure caused by a setting or a file it points at
    pub fn log_config_error(error: &impl std::fmt::Display, setting: &str, stage: &str) {
        error!(
            error = %error,
            setting = %setting,
            stage = %stage,
            "Startup configuration error"
        );
    }
}

/// Test-only tracing layer that records events emitted on the current
/// thread.
#[cfg(test)]
pub(crate) mod log_capture {
    use std::fmt;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::subscriber::DefaultGuard;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[derive(Debug, Clone)]
    pub struct CapturedEvent {
        pub level: Level,
        pub fields: Vec<(String, String)>,
    }

    impl CapturedEvent {
        pub fn field(&self, name: &str) -> Option<&str> {
            self.fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        }

        pub fn message(&self) -> &str {
            self.field("message").unwrap_or_default()
        }
    }

    struct FieldRecorder<'a>(&'a mut Vec<(String, String)>);

    impl Visit for FieldRecorder<'_> {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.push((field.name().to_string(), value.to_string()));
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    struct CaptureLayer(Arc<Mutex<Vec<CapturedEvent>>>);

    impl<S: Subscriber> Layer<S> for CaptureLayer {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = Vec::new();
            event.record(&mut FieldRecorder(&mut fields));
            self.0.lock().push(CapturedEvent {
                level: *event.metadata().level(),
                fields,
            });
        }
    }

    /// Captures until dropped. Single-threaded tokio tests see every event
    /// their handlers emit.
    pub struct LogCapture {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
        _guard: DefaultGuard,
    }

    impl LogCapture {
        pub fn start() -> Self {
            let events = Arc::new(Mutex::new(Vec::new()));
            let subscriber =
                tracing_subscriber::registry().with(CaptureLayer(Arc::clone(&events)));
            Self {
                events,
                _guard: tracing::subscriber::set_default(subscriber),
            }
        }

        pub fn events(&self) -> Vec<CapturedEvent> {
            self.events.lock().clone()
        }

        pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
            self.events()
                .into_iter()
                .filter(|event| event.message() == message)
                .collect()
        }
    }
}
