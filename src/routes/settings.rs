//! Operator settings endpoints
//!
//! Endpoints:
//! - GET /api/v1/settings/api-key - Whether a credential is configured
//! - PUT /api/v1/settings/api-key - Store the credential

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::{SettingsStore, API_KEY_SETTING};
use crate::state::AppState;

/// Create the settings router
pub fn router() -> Router<AppState> {
    Router::new().route("/api-key", get(get_api_key).put(put_api_key))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiKeyStatus {
    configured: bool,
    /// `stored` when set through this endpoint, `environment` for the
    /// fallback key. The key itself is never echoed back.
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'static str>,
}

/// GET /api/v1/settings/api-key
async fn get_api_key(State(state): State<AppState>) -> Result<Json<ApiKeyStatus>> {
    let settings = SettingsStore::new(state.db());
    let stored = settings
        .load(API_KEY_SETTING)
        .await?
        .filter(|key| !key.trim().is_empty());

    let status = if stored.is_some() {
        ApiKeyStatus {
            configured: true,
            source: Some("stored"),
        }
    } else if state.config().extraction.api_key.is_some() {
        ApiKeyStatus {
            configured: true,
            source: Some("environment"),
        }
    } else {
        ApiKeyStatus {
            configured: false,
            source: None,
        }
    };

    Ok(Json(status))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveApiKeyRequest {
    api_key: String,
}

/// PUT /api/v1/settings/api-key
///
/// Saving an empty key clears the stored credential; the environment
/// fallback, if any, takes over again.
async fn put_api_key(
    State(state): State<AppState>,
    Json(request): Json<SaveApiKeyRequest>,
) -> Result<StatusCode> {
    let settings = SettingsStore::new(state.db());
    settings
        .save(API_KEY_SETTING, request.api_key.trim())
        .await?;

    tracing::info!("api key updated");
    Ok(StatusCode::NO_CONTENT)
}
