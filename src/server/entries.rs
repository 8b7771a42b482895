//! Entry CRUD, calendar and photo upload handlers.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path as StdPath;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, warn};

use super::models::{DeletedResponse, ImageUploadResponse, MessageResponse};
use super::{read_upload, ServerState, UserId};
use crate::db::{self, CalendarEntry, EntryChanges, NewEntry, SkincareEntry};
use crate::errors::{error_logging, AppError, AppResult};
use crate::path_validation;
use crate::validation;

/// `{ "YYYY-MM-DD": { id, skin_condition, has_image } }`
pub async fn calendar_entries(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
) -> AppResult<Json<BTreeMap<String, CalendarEntry>>> {
    let entries = db::list_calendar_entries(&state.pool, user_id).await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|entry| (entry.date.to_string(), entry))
            .collect(),
    ))
}

pub async fn get_entry_by_date(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
    Path(date): Path<String>,
) -> AppResult<Json<SkincareEntry>> {
    let date = validation::parse_entry_date(&date)?;
    db::read_entry_by_date(&state.pool, user_id, date)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Entry not found".to_string()))
}

pub async fn create_entry(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
    Json(payload): Json<NewEntry>,
) -> AppResult<Json<SkincareEntry>> {
    validation::validate_new_entry(&payload)?;

    let entry = db::create_entry(&state.pool, user_id, &payload)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Entry already exists for this date. Use PUT to update.".to_string())
        })?;

    info!(user_id, entry_id = entry.id, date = %entry.date, "Entry created");
    Ok(Json(entry))
}

pub async fn update_entry(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
    Path(entry_id): Path<i64>,
    Json(changes): Json<EntryChanges>,
) -> AppResult<Json<MessageResponse>> {
    validation::validate_entry_changes(&changes)?;

    if !db::update_entry(&state.pool, user_id, entry_id, &changes).await? {
        return Err(AppError::NotFound("Entry not found".to_string()));
    }
    Ok(Json(MessageResponse {
        id: entry_id,
        message: "Entry updated successfully".to_string(),
    }))
}

/// Deletes the row first; a stored photo that cannot be removed is only
/// logged.
pub async fn delete_entry(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
    Path(entry_id): Path<i64>,
) -> AppResult<Json<DeletedResponse>> {
    let deleted = db::delete_entry(&state.pool, user_id, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".to_string()))?;

    if let Some(name) = deleted
        .image_path
        .as_deref()
        .and_then(path_validation::stored_name_from_public_path)
    {
        let path = state.uploads_dir.join(name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            error_logging::log_filesystem_error(
                &e,
                "delete_entry_image",
                Some(&path.display().to_string()),
                None,
            );
        }
    }

    Ok(Json(DeletedResponse {
        message: "Entry deleted successfully".to_string(),
        deleted_id: deleted.id,
    }))
}

pub async fn upload_image(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
    Path(entry_id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<ImageUploadResponse>> {
    let upload = read_upload(multipart, state.max_upload_bytes).await?;

    if db::read_entry(&state.pool, user_id, entry_id).await?.is_none() {
        return Err(AppError::NotFound("Entry not found".to_string()));
    }

    let stored_name = path_validation::stored_upload_name(
        entry_id,
        &upload.filename,
        chrono::Utc::now().timestamp_millis(),
    );
    let owner = UploadOwner { user_id, entry_id };
    let pool = &state.pool;
    let image_path = store_entry_image(
        &state.uploads_dir,
        &stored_name,
        &upload.bytes,
        owner,
        |image_path| async move {
            db::set_entry_image(pool, user_id, entry_id, &image_path)
                .await
                .map_err(AppError::from)
        },
    )
    .await?;

    info!(user_id, entry_id, size_bytes = upload.bytes.len(), "Entry image stored");
    Ok(Json(ImageUploadResponse {
        message: "Image uploaded successfully".to_string(),
        image_path,
    }))
}

#[derive(Debug, Clone, Copy)]
struct UploadOwner {
    user_id: i64,
    entry_id: i64,
}

impl UploadOwner {
    fn failure(self, operation: &str, message: String) -> AppError {
        error_logging::log_internal_error(
            &message,
            "uploads",
            operation,
            Some(self.user_id),
            Some(self.entry_id),
        );
        AppError::Internal(message)
    }
}

/// Write the upload under `uploads_dir`, then let `attach` point the entry
/// at its public path. The file is removed again when attaching fails or
/// finds no entry.
async fn store_entry_image<F, Fut>(
    uploads_dir: &StdPath,
    stored_name: &str,
    bytes: &[u8],
    owner: UploadOwner,
    attach: F,
) -> AppResult<String>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    let path = path_validation::resolve_upload_path(uploads_dir, stored_name).map_err(|e| {
        owner.failure(
            "resolve_upload_path",
            format!("Generated upload name rejected: {}", e),
        )
    })?;

    tokio::fs::create_dir_all(uploads_dir).await.map_err(|e| {
        owner.failure(
            "create_uploads_dir",
            format!("Cannot create uploads directory: {}", e),
        )
    })?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| owner.failure("write_upload", format!("Cannot store upload: {}", e)))?;

    let image_path = path_validation::public_upload_path(stored_name);
    let outcome = attach(image_path.clone()).await;
    if !matches!(outcome, Ok(true)) {
        discard_upload(&path).await;
    }

    match outcome {
        Ok(true) => Ok(image_path),
        Ok(false) => {
            warn!(entry_id = owner.entry_id, "Entry disappeared while its image was uploaded");
            Err(AppError::NotFound("Entry not found".to_string()))
        }
        Err(e) => Err(e),
    }
}

async fn discard_upload(path: &StdPath) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        error_logging::log_filesystem_error(
            &e,
            "discard_upload",
            Some(&path.display().to_string()),
            None,
        );
    }
}

pub async fn serve_upload(
    State(state): State<Arc<ServerState>>,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    let path = path_validation::resolve_upload_path(&state.uploads_dir, &filename)
        .map_err(|e| AppError::Validation(format!("Invalid filename: {}", e)))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::NotFound("Image not found".to_string()))?;
    let mime = image::guess_format(&bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, mime)], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::log_capture::LogCapture;

    const OWNER: UploadOwner = UploadOwner {
        user_id: 7,
        entry_id: 3,
    };

    fn stored_files(dir: &StdPath) -> Vec<String> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_attached_upload_is_kept() {
        let dir = tempfile::TempDir::new().unwrap();
        let attach = |path: String| async move {
            assert_eq!(path, "/uploads/entry_3_10.png");
            Ok::<_, AppError>(true)
        };
        let image_path = store_entry_image(dir.path(), "entry_3_10.png", b"png", OWNER, attach)
            .await
            .unwrap();

        assert_eq!(image_path, "/uploads/entry_3_10.png");
        assert_eq!(stored_files(dir.path()), vec!["entry_3_10.png"]);
    }

    #[tokio::test]
    async fn test_upload_removed_when_attach_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let attach = |_: String| async {
            Err::<bool, _>(AppError::Database("connection refused".to_string()))
        };
        let result = store_entry_image(dir.path(), "entry_3_11.png", b"png", OWNER, attach).await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(stored_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_upload_removed_when_entry_is_gone() {
        let dir = tempfile::TempDir::new().unwrap();
        let attach = |_: String| async { Ok::<_, AppError>(false) };
        let result = store_entry_image(dir.path(), "entry_3_12.png", b"png", OWNER, attach).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(stored_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_is_logged_as_internal() {
        let dir = tempfile::TempDir::new().unwrap();
        // a regular file where the uploads directory should be
        let blocked = dir.path().join("uploads");
        std::fs::write(&blocked, b"not a directory").unwrap();

        let capture = LogCapture::start();
        let attach = |_: String| async { Ok::<_, AppError>(true) };
        let result = store_entry_image(&blocked, "entry_3_13.png", b"png", OWNER, attach).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        let events = capture.with_message("Internal error while handling request");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field("component"), Some("uploads"));
        assert_eq!(events[0].field("entry_id"), Some("Some(3)"));
    }
}
