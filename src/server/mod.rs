//! HTTP API for the skincare journal.

pub mod analysis;
pub mod analytics;
pub mod entries;
pub mod models;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, FromRequestParts, MatchedPath, Multipart, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, Instrument};

use crate::errors::{AppError, AppResult};
use crate::observability;
use crate::validation;

pub use models::ErrorResponse;
pub use state::ServerState;

/// Room for multipart framing on top of the image itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: Arc<ServerState>) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health))
        .route("/skincare/calendar/entries", get(entries::calendar_entries))
        .route("/skincare/entries", post(entries::create_entry))
        .route("/skincare/entries/ai-analysis", post(analysis::ai_analysis))
        .route(
            "/skincare/entries/:key",
            get(entries::get_entry_by_date)
                .put(entries::update_entry)
                .delete(entries::delete_entry),
        )
        .route("/skincare/entries/:key/upload-image", post(entries::upload_image))
        .route("/skincare/uploads/:filename", get(entries::serve_upload))
        .route(
            "/skincare/products/compatibility",
            post(analysis::product_compatibility),
        )
        .route("/skincare/analytics/overview", get(analytics::overview))
        .route("/skincare/analytics/skin-progress", get(analytics::skin_progress))
        .route(
            "/skincare/analytics/product-effectiveness",
            get(analytics::product_effectiveness),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(track_requests))
        .layer(axum::middleware::from_fn_with_state(state.clone(), cors_middleware))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: Arc<ServerState>, addr: SocketAddr) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    info!(%addr, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server stopped with an error")?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn track_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let span = observability::http_span(&method, &route);
    let started = Instant::now();

    let response = next.run(req).instrument(span).await;

    observability::record_request_metrics(
        &method,
        &route,
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}

async fn cors_middleware(
    State(state): State<Arc<ServerState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut(), &state.cors_origin);
        return response;
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut(), &state.cors_origin);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: &str) {
    if let Ok(origin) = HeaderValue::from_str(origin) {
        headers.insert("access-control-allow-origin", origin);
    }
    headers.insert(
        "access-control-allow-credentials",
        HeaderValue::from_static("true"),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization,x-user-id"),
    );
}

/// Caller identity from the `x-user-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-id")
            .ok_or_else(|| AppError::Validation("x-user-id header is required".to_string()))?;
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                AppError::Validation("x-user-id must be a positive integer".to_string())
            })?;
        tracing::Span::current().record("user_id", user_id);
        Ok(UserId(user_id))
    }
}

/// Collect the `file` part and an optional `date` part. The image is
/// size-checked and format-sniffed before it is returned.
pub(crate) async fn read_upload(
    mut multipart: Multipart,
    max_bytes: usize,
) -> AppResult<models::UploadForm> {
    let mut form = models::UploadForm::default();
    let mut has_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.filename = field.file_name().unwrap_or("upload").to_string();
                form.content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                form.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read upload: {}", e)))?
                    .to_vec();
                has_file = true;
            }
            "date" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read date: {}", e)))?;
                if !value.trim().is_empty() {
                    form.date = Some(validation::parse_entry_date(value.trim())?);
                }
            }
            _ => {}
        }
    }

    if !has_file {
        return Err(AppError::Validation("Multipart field 'file' is required".to_string()));
    }
    let format = validation::validate_image_upload(&form.bytes, max_bytes)?;
    if form.content_type == "application/octet-stream" {
        form.content_type = format.to_mime_type().to_string();
    }
    Ok(form)
}
