//! Custom catalog entry management (CRUD)
//!
//! Entries are identified by their sequence `no` within the custom catalog
//! file. After a successful mutation the hub is asked to reload its config,
//! when enabled, so the box sees the change without a restart.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::CatalogEntry;
use crate::pagination::{paginate, PageParams};
use crate::services::catalog::{EntryCreateRequest, EntryUpdateRequest};
use crate::AppState;

/// Paginated catalog entry listing
#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub items: Vec<CatalogEntry>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub success: bool,
    pub error: Option<String>,
}

/// GET /api/entries
pub async fn list_entries(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Json<EntriesResponse> {
    let entries = state.catalog.load();
    let total_count = entries.len();
    let (items, info) = paginate(&entries, params);

    Json(EntriesResponse {
        items,
        total_count,
        page: info.page,
        page_size: info.page_size,
        has_next: info.has_next,
        has_prev: info.has_prev,
        success: true,
        error: None,
    })
}

/// GET /api/entries/:no
pub async fn get_entry(
    State(state): State<AppState>,
    Path(no): Path<String>,
) -> Result<Json<CatalogEntry>> {
    state
        .catalog
        .get_by_no(&no)
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("catalog entry with no '{}'", no)))
}

/// POST /api/entries
///
/// Creates a custom entry. A missing model id is auto-assigned from the
/// reserved custom range.
pub async fn create_entry(
    State(state): State<AppState>,
    Json(request): Json<EntryCreateRequest>,
) -> Result<(StatusCode, Json<CatalogEntry>)> {
    let model = match request.model.clone().filter(|m| !m.trim().is_empty()) {
        Some(model) => model,
        None => {
            let model = state.catalog.next_custom_model();
            tracing::info!("Auto-assigned model number: {}", model);
            model
        }
    };

    let entry = state.catalog.create(model, request)?;
    reload_hub_if_enabled(&state).await;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT /api/entries/:no
pub async fn update_entry(
    State(state): State<AppState>,
    Path(no): Path<String>,
    Json(request): Json<EntryUpdateRequest>,
) -> Result<Json<CatalogEntry>> {
    let entry = state.catalog.update(&no, request)?;
    reload_hub_if_enabled(&state).await;
    Ok(Json(entry))
}

/// DELETE /api/entries/:no
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(no): Path<String>,
) -> Result<StatusCode> {
    state.catalog.delete(&no)?;
    reload_hub_if_enabled(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Next free custom model response
#[derive(Debug, Serialize)]
pub struct NextModelResponse {
    pub next_model: String,
}

/// GET /api/entries/next-model
pub async fn next_model(State(state): State<AppState>) -> Json<NextModelResponse> {
    Json(NextModelResponse {
        next_model: state.catalog.next_custom_model(),
    })
}

async fn reload_hub_if_enabled(state: &AppState) {
    if state.config.app.auto_reload_config {
        state.hub.trigger_config_reload().await;
    }
}
