//! Bulk export endpoint
//!
//! Packs every processed photo (success or error) into one zip archive,
//! renamed through the shared export naming rule.

use std::collections::hash_map::{Entry, HashMap};

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::error::{AppError, Result};
use crate::export::{build_archive, export_file_name, ARCHIVE_FILE_NAME};
use crate::images::ImageStore;
use crate::state::AppState;

/// Create the export router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(export_archive))
}

/// GET /api/v1/export
async fn export_archive(State(state): State<AppState>) -> Result<Response> {
    let records: Vec<_> = state
        .registry()
        .all()
        .await
        .into_iter()
        .filter(|r| r.status.is_terminal())
        .collect();

    if records.is_empty() {
        return Err(AppError::NotFound(
            "no processed images to export".to_string(),
        ));
    }

    let store = ImageStore::new(state.db());

    // The archive folder is keyed by file name; a later record with the
    // same export name replaces the earlier one.
    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(records.len());
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for record in &records {
        let Some(bytes) = store.get_bytes(record.id).await? else {
            tracing::warn!(image_id = %record.id, "image bytes missing, skipping from archive");
            continue;
        };
        let name = export_file_name(record);
        match by_name.entry(name.clone()) {
            Entry::Occupied(slot) => {
                entries[*slot.get()] = (name, bytes);
            }
            Entry::Vacant(slot) => {
                slot.insert(entries.len());
                entries.push((name, bytes));
            }
        }
    }

    let archive = build_archive(&entries)?;
    tracing::info!(
        images = entries.len(),
        bytes = archive.len(),
        "built export archive"
    );

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, archive.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", ARCHIVE_FILE_NAME),
        )
        .body(Body::from(archive))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}
