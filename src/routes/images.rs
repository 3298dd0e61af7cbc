//! Image endpoints
//!
//! Ingestion, listing, single-file download and clearing.
//!
//! Endpoints:
//! - POST   /api/v1/images - Multipart upload of one or more photos
//! - GET    /api/v1/images - List records and aggregate counts
//! - GET    /api/v1/images/:id/file - Download one original, renamed
//! - DELETE /api/v1/images - Destroy every record

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::export::export_file_name;
use crate::images::{ImageRecord, ImageStore, StatusCounts};
use crate::pipeline::BATCH_SIZE;
use crate::state::AppState;

/// Maximum accepted upload body: a full batch of high-resolution photos
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Create the images router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_images).get(list_images).delete(clear_images))
        .route("/:id/file", get(serve_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    images: Vec<ImageRecord>,
}

/// POST /api/v1/images
///
/// Each file part becomes one fresh `pending` record: persisted first, then
/// appended to the in-memory list.
async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let store = ImageStore::new(state.db());
    let mut ingested = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        // Parts without a file name are form fields, not photos.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let mime_type = field.content_type().map(str::to_string).unwrap_or_else(|| {
            mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .to_string()
        });
        if !mime_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "unsupported file type: {}",
                mime_type
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest(format!("empty file: {}", file_name)));
        }

        let record = ImageRecord::new(file_name, mime_type);
        store.insert(&record, &bytes).await?;
        state.registry().insert(record.clone()).await;

        tracing::debug!(
            image_id = %record.id,
            file_name = %record.file_name,
            size = bytes.len(),
            "ingested image"
        );
        ingested.push(record);
    }

    if ingested.is_empty() {
        return Err(AppError::BadRequest("no files in request".to_string()));
    }

    tracing::info!(count = ingested.len(), "ingested image batch");
    Ok(Json(UploadResponse { images: ingested }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    images: Vec<ImageRecord>,
    counts: StatusCounts,
    /// Size of the batch the next run would process.
    next_batch: usize,
}

/// GET /api/v1/images
async fn list_images(State(state): State<AppState>) -> Json<ListResponse> {
    let images = state.registry().all().await;
    let counts = state.registry().counts().await;

    Json(ListResponse {
        images,
        next_batch: counts.pending.min(BATCH_SIZE),
        counts,
    })
}

/// GET /api/v1/images/:id/file
///
/// Serves the original bytes under the export name, so a single download
/// and the bulk archive agree on naming.
async fn serve_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let record = state
        .registry()
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("image {}", id)))?;

    let store = ImageStore::new(state.db());
    let bytes = store
        .get_bytes(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("image data {}", id)))?;

    let filename = export_file_name(&record);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.mime_type)
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

/// DELETE /api/v1/images
///
/// Destroys every record in both views and resets run progress.
async fn clear_images(State(state): State<AppState>) -> Result<StatusCode> {
    let store = ImageStore::new(state.db());
    let removed = store.clear().await?;
    state.registry().clear().await;
    state.progress().reset();

    tracing::info!(removed = removed, "cleared all images");
    Ok(StatusCode::NO_CONTENT)
}
