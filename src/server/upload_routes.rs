//! Streaming-history HTTP routes: archive upload, upload listing and
//! account-wide data deletion.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::history_store::UploadBatch;
use crate::ingest::ingest_archive;
use crate::server::session::Session;
use crate::server::state::{GuardedHistoryStore, ServerState};
use crate::server::ServerConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadSuccessResponse {
    success: bool,
    message: String,
    total_files: usize,
    quality_streams: usize,
    upload_id: String,
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({"success": false, "message": message.into()})),
    )
        .into_response()
}

/// POST /upload - ingest one exported streaming-history archive.
///
/// Preconditions are checked in a fixed order, first match wins: resolved
/// session (handled by the extractor), file part present, size within the
/// ceiling, `.zip` extension. Only after the whole pipeline succeeds is
/// anything persisted.
async fn upload_history(
    session: Session,
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Response {
    let mut filename: Option<String> = None;
    let mut data: Option<axum::body::Bytes> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            filename = field.file_name().map(|s| s.to_string());
            match field.bytes().await {
                Ok(bytes) => data = Some(bytes),
                Err(e) => {
                    warn!("Failed to read uploaded file data: {}", e);
                    return failure(StatusCode::BAD_REQUEST, "Failed to read file");
                }
            }
        }
    }

    let filename = match filename {
        Some(f) if !f.is_empty() => f,
        _ => return failure(StatusCode::BAD_REQUEST, "File does not exist"),
    };
    let data = match data {
        Some(d) if !d.is_empty() => d,
        _ => return failure(StatusCode::BAD_REQUEST, "File does not exist"),
    };

    let file_size = data.len() as u64;
    if file_size > state.config.max_upload_bytes {
        return failure(
            StatusCode::BAD_REQUEST,
            format!(
                "File is bigger than {:#}",
                byte_unit::Byte::from(state.config.max_upload_bytes)
            ),
        );
    }

    if !filename.to_lowercase().ends_with(".zip") {
        return failure(StatusCode::BAD_REQUEST, "Uploaded File is not a .zip File");
    }

    // Archive decoding and JSON parsing are CPU-bound, keep them off the
    // async executor.
    let bytes = data.to_vec();
    let pipeline_result = match tokio::task::spawn_blocking(move || ingest_archive(bytes)).await {
        Ok(result) => result,
        Err(err) => {
            error!("Ingestion task failed to complete: {}", err);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed");
        }
    };

    let summary = match pipeline_result {
        Ok(summary) => summary,
        Err(err) => {
            info!("Rejected upload from user {}: {}", session.user_id, err);
            return failure(StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    let batch = UploadBatch {
        id: Uuid::new_v4().to_string(),
        user_id: session.user_id,
        filename: filename.clone(),
        uploaded_at: Utc::now().timestamp(),
        record_count: summary.records.len(),
        file_size,
    };

    if let Err(err) = state.history_store.insert_upload(&batch) {
        error!("Failed to persist upload batch {}: {}", batch.id, err);
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed");
    }
    if let Err(err) =
        state
            .history_store
            .insert_records(session.user_id, &batch.id, &summary.records)
    {
        error!("Failed to persist records for upload {}: {}", batch.id, err);
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed");
    }

    info!(
        "User {} uploaded {} ({} files scanned, {} quality streams)",
        session.user_id,
        filename,
        summary.files_scanned,
        summary.records.len()
    );

    Json(UploadSuccessResponse {
        success: true,
        message: format!(
            "Successfully stored {} quality music streams in database",
            summary.records.len()
        ),
        total_files: summary.files_scanned,
        quality_streams: summary.records.len(),
        upload_id: batch.id,
    })
    .into_response()
}

/// DELETE / - delete every streaming record and upload owned by the caller.
async fn delete_history(
    session: Session,
    State(history_store): State<GuardedHistoryStore>,
) -> Response {
    match history_store.delete_user_data(session.user_id) {
        Ok(deleted) => {
            info!(
                "Deleted {} records and {} uploads for user {}",
                deleted.records, deleted.uploads, session.user_id
            );
            Json(json!({
                "success": true,
                "message": format!(
                    "Deleted {} streaming records and {} uploads",
                    deleted.records, deleted.uploads
                ),
                "deletedRecords": deleted.records,
                "deletedUploads": deleted.uploads,
            }))
            .into_response()
        }
        Err(err) => {
            warn!(
                "Failed to delete data for user {}: {}",
                session.user_id, err
            );
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete user data",
            )
        }
    }
}

/// GET /uploads - the caller's upload batches, most recent first.
async fn list_uploads(
    session: Session,
    State(history_store): State<GuardedHistoryStore>,
) -> Response {
    match history_store.get_user_uploads(session.user_id) {
        Ok(uploads) => Json(json!({"success": true, "data": uploads})).into_response(),
        Err(err) => {
            warn!(
                "Failed to list uploads for user {}: {}",
                session.user_id, err
            );
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list uploads")
        }
    }
}

pub fn history_routes(config: &ServerConfig) -> Router<ServerState> {
    // Transport limit sits above the business ceiling so that the handler's
    // own size check produces the user-facing error.
    let body_limit = config.max_upload_bytes as usize + 1024 * 1024;
    let upload_route = Router::new()
        .route("/upload", post(upload_history))
        .layer(DefaultBodyLimit::max(body_limit));

    upload_route
        .route("/", delete(delete_history))
        .route("/uploads", get(list_uploads))
}
