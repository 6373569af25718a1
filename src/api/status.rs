//! Service status and hub maintenance endpoints

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

/// Status of the service's collaborators
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// "ok" when every check passes, else "degraded"
    pub status: String,
    pub hub_connected: bool,
    pub library_reachable: bool,
    pub catalog_readable: bool,
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let hub_connected = state.hub.check_connection().await;
    let library_reachable = if hub_connected {
        state.hub.file_index("").await.is_ok()
    } else {
        false
    };
    let catalog_readable = state.hub.custom_catalog().await.is_ok();

    let all_ok = hub_connected && library_reachable && catalog_readable;
    Json(StatusResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        hub_connected,
        library_reachable,
        catalog_readable,
    })
}

/// Hub reload result
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: String,
    pub message: String,
}

/// POST /api/hub/reload
///
/// Ask the hub to write its config and reload the catalog.
pub async fn reload_hub(State(state): State<AppState>) -> Json<ReloadResponse> {
    if state.hub.trigger_config_reload().await {
        Json(ReloadResponse {
            status: "success".to_string(),
            message: "Hub configuration reloaded".to_string(),
        })
    } else {
        Json(ReloadResponse {
            status: "warning".to_string(),
            message: "Reload triggered but may have failed".to_string(),
        })
    }
}
