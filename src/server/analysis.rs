//! Remote skin analysis and product-label compatibility handlers.

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::Json;
use tracing::{info, warn};

use super::models::{CompatibilityQuery, CompatibilityResponse, LabelSource, SkinAnalysisResponse};
use super::{read_upload, ServerState, UserId};
use crate::db;
use crate::errors::{error_logging, AppError, AppResult};
use crate::skin_analysis::summarize_analysis;

/// Analyze a face photo. With a `date` field the summary is also stored on
/// that day's entry, created if needed. Storing the summary and archiving
/// the raw response are best effort.
pub async fn ai_analysis(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
    multipart: Multipart,
) -> AppResult<Json<SkinAnalysisResponse>> {
    let analyzer = state
        .skin_analyzer
        .clone()
        .ok_or_else(|| AppError::Config("Skin analysis is not configured".to_string()))?;
    let upload = read_upload(multipart, state.max_upload_bytes).await?;
    info!(user_id, filename = %upload.filename, size_bytes = upload.bytes.len(), "Analyzing skin image");

    let raw = analyzer
        .analyze(upload.bytes, &upload.filename, &upload.content_type)
        .await?;
    let summary = summarize_analysis(&raw);

    let mut entry_id = None;
    if let Some(date) = upload.date {
        match db::record_analysis_for_date(&state.pool, user_id, date, &summary).await {
            Ok(id) => entry_id = Some(id),
            Err(e) => error_logging::log_database_error(
                &format!("{:#}", e),
                "record_analysis_for_date",
                Some(user_id),
                Some(&[("date", &date as &dyn std::fmt::Display)]),
            ),
        }
    }

    let archive_id = match db::archive_skin_analysis(&state.pool, user_id, &raw.to_string()).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(user_id, error = %format!("{:#}", e), "Continuing without skin_analyses storage");
            None
        }
    };

    Ok(Json(SkinAnalysisResponse {
        id: archive_id,
        result: summary,
        raw_data: raw,
        entry_id,
        message: "Skin analysis completed successfully".to_string(),
    }))
}

/// Score a product label photo against the configured bad-ingredient lists.
/// `?source=llm` reads the label with the LLM reader instead of OCR.
pub async fn product_compatibility(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<CompatibilityQuery>,
    multipart: Multipart,
) -> AppResult<Json<CompatibilityResponse>> {
    let upload = read_upload(multipart, state.max_upload_bytes).await?;

    let response = match query.source {
        LabelSource::Ocr => {
            let report = state.pipeline.analyze(upload.bytes).await?;
            CompatibilityResponse {
                source: LabelSource::Ocr,
                compatibility_score: report.compatibility_score,
                ingredients: report.ingredients,
                flagged: report.flagged,
                raw_text: Some(report.raw_text),
                corrected_text: Some(report.corrected_text),
            }
        }
        LabelSource::Llm => {
            let reader = state.label_reader.clone().ok_or_else(|| {
                AppError::Validation("LLM label reader is not configured".to_string())
            })?;
            let items = reader
                .read_ingredients(&upload.bytes, &upload.content_type)
                .await?;
            let report = state.pipeline.score_llm_list(&items)?;
            CompatibilityResponse {
                source: LabelSource::Llm,
                compatibility_score: report.compatibility_score,
                ingredients: report.ingredients,
                flagged: report.flagged,
                raw_text: None,
                corrected_text: None,
            }
        }
    };

    info!(
        source = ?response.source,
        score = response.compatibility_score,
        flagged = response.flagged.len(),
        "Product compatibility computed"
    );
    Ok(Json(response))
}
