use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compatibility::FlaggedIngredient;
use crate::errors::AppError;
use crate::pipeline_errors::PipelineError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP status for each error kind.
pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Pipeline(PipelineError::Io(_)) => StatusCode::BAD_REQUEST,
        AppError::Pipeline(PipelineError::InvalidInput(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::Pipeline(PipelineError::Upstream { .. }) => StatusCode::BAD_GATEWAY,
        AppError::Pipeline(PipelineError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        AppError::Pipeline(PipelineError::Engine(_))
        | AppError::Config(_)
        | AppError::Database(_)
        | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.client_message(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: String,
    pub deleted_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub message: String,
    pub image_path: String,
}

#[derive(Debug, Serialize)]
pub struct SkinAnalysisResponse {
    /// Archive row ID; `None` when archiving failed
    pub id: Option<i64>,
    pub result: String,
    pub raw_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CompatibilityResponse {
    pub source: LabelSource,
    pub compatibility_score: f64,
    pub ingredients: Vec<String>,
    pub flagged: Vec<FlaggedIngredient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_text: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    #[default]
    Ocr,
    Llm,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompatibilityQuery {
    #[serde(default)]
    pub source: LabelSource,
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<u32>,
}

/// Multipart upload with the optional `date` form field
#[derive(Debug, Default)]
pub struct UploadForm {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    pub date: Option<NaiveDate>,
}
