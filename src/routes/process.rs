//! Batch processing endpoints
//!
//! Endpoints:
//! - POST /api/v1/process - Run one batch to completion
//! - GET  /api/v1/process/status - Current run progress

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::Result;
use crate::pipeline::{BatchSummary, RunOutcome, RunSnapshot};
use crate::state::AppState;

/// Create the process router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(run_batch))
        .route("/status", get(run_status))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResponse {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<BatchSummary>,
}

/// POST /api/v1/process
///
/// Runs one batch to completion and answers with the aggregate summary.
/// A concurrent request while a run is in flight is a no-op (`busy`); a
/// missing credential fails the precondition without touching any record.
async fn run_batch(State(state): State<AppState>) -> Result<Json<RunResponse>> {
    let credential = state.resolve_credential().await?;

    let outcome = state.pipeline().run(&credential, state.progress()).await?;

    let response = match outcome {
        RunOutcome::Completed(summary) => RunResponse {
            outcome: "completed",
            summary: Some(summary),
        },
        RunOutcome::Busy => RunResponse {
            outcome: "busy",
            summary: None,
        },
        RunOutcome::Empty => RunResponse {
            outcome: "empty",
            summary: None,
        },
    };

    Ok(Json(response))
}

/// GET /api/v1/process/status
async fn run_status(State(state): State<AppState>) -> Json<RunSnapshot> {
    Json(state.progress().snapshot())
}
