//! Tag management endpoints
//!
//! Two listing surfaces share the tag response shape: the filesystem-wide
//! listing (every tag with a state file on disk) and the per-box view from
//! the reconciliation engine (bounded to the last played tag plus setup
//! candidates). Plus the link-write operation and box registry lookups.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{BoxRegistration, LinkedEntry, TagRecord};
use crate::pagination::{paginate, PageInfo, PageParams};
use crate::services::catalog::CatalogIndex;
use crate::services::reconcile::TagLinkage;
use crate::AppState;

/// Paginated tag response with per-status counts. `success`/`error` let
/// callers distinguish an empty tag set from a failed load.
#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub items: Vec<TagRecord>,
    pub total_count: usize,
    pub unconfigured_count: usize,
    pub unassigned_count: usize,
    pub assigned_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub success: bool,
    pub error: Option<String>,
}

impl TagsResponse {
    fn from_linkage(linkage: TagLinkage, info: PageInfo, items: Vec<TagRecord>) -> Self {
        Self {
            items,
            total_count: linkage.total_count,
            unconfigured_count: linkage.unconfigured_count,
            unassigned_count: linkage.unassigned_count,
            assigned_count: linkage.assigned_count,
            page: info.page,
            page_size: info.page_size,
            has_next: info.has_next,
            has_prev: info.has_prev,
            success: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            unconfigured_count: 0,
            unassigned_count: 0,
            assigned_count: 0,
            page: 1,
            page_size: crate::pagination::DEFAULT_PAGE_SIZE,
            has_next: false,
            has_prev: false,
            success: false,
            error: Some(error),
        }
    }
}

/// GET /api/tags
///
/// Filesystem-wide tag listing: every tag with a state file on disk,
/// joined to the catalog by model id. Statuses are derived as stored;
/// this surface does not relink stale device data.
pub async fn get_tags(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Json<TagsResponse> {
    let mut tags = state.engine.tags.list_tags();
    let index = CatalogIndex::build(state.engine.catalog_entries().await);
    for tag in &mut tags {
        if let Some(entry) = index.by_model(&tag.model) {
            tag.linked_entry = Some(LinkedEntry::from(entry));
        }
    }

    let linkage = TagLinkage::from_tags(tags);
    let (items, info) = paginate(&linkage.tags, params);
    Json(TagsResponse::from_linkage(linkage, info, items))
}

/// GET /api/tags/box/:box_id
///
/// Reconciled per-box tag view. Counts cover the filtered (bounded) set.
pub async fn get_box_tags(
    State(state): State<AppState>,
    Path(box_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Json<TagsResponse> {
    match state.engine.tag_linkage(&box_id).await {
        Ok(linkage) => {
            let (items, info) = paginate(&linkage.tags, params);
            Json(TagsResponse::from_linkage(linkage, info, items))
        }
        Err(e) => Json(TagsResponse::failed(format!(
            "Failed to load tags for box {}: {}",
            box_id, e
        ))),
    }
}

/// Registered boxes response
#[derive(Debug, Serialize)]
pub struct BoxesResponse {
    pub boxes: Vec<BoxRegistration>,
}

/// GET /api/tags/boxes
///
/// Registered boxes from the hub registration file, sorted by name.
/// Box ids are certificate ids, usable as the hub's overlay parameter.
pub async fn get_boxes(State(state): State<AppState>) -> Json<BoxesResponse> {
    Json(BoxesResponse {
        boxes: state.engine.boxes.list(),
    })
}

/// Last played response
#[derive(Debug, Serialize)]
pub struct LastPlayedResponse {
    /// Lowercase uid, or empty when no valid candidate exists
    pub last_played: String,
}

/// GET /api/tags/box/:box_id/last-played
pub async fn get_last_played(
    State(state): State<AppState>,
    Path(box_id): Path<String>,
) -> Json<LastPlayedResponse> {
    Json(LastPlayedResponse {
        last_played: state.engine.last_played(&box_id).await.unwrap_or_default(),
    })
}

/// Request to link a tag to a content file
#[derive(Debug, Deserialize)]
pub struct LinkTagRequest {
    pub tag_uid: String,
    pub box_id: String,
    pub model: String,
    /// Path relative to the library root ("folder/file.taf")
    pub content_path: String,
}

/// Link operation result
#[derive(Debug, Serialize)]
pub struct LinkTagResponse {
    pub success: bool,
    pub message: String,
    /// The source reference written to the tag state file
    pub source: String,
}

/// POST /api/tags/link
///
/// Partially updates the tag's state file (model, source, no-cloud flag;
/// everything else preserved). A write failure propagates: it is lost user
/// intent and must not be retried silently.
pub async fn link_tag(
    State(state): State<AppState>,
    Json(request): Json<LinkTagRequest>,
) -> Result<Json<LinkTagResponse>> {
    let source = state.engine.tags.link_tag(
        &request.tag_uid,
        &request.box_id,
        &request.model,
        &request.content_path,
    )?;

    Ok(Json(LinkTagResponse {
        success: true,
        message: format!("Tag {} linked to {}", request.tag_uid, request.content_path),
        source,
    }))
}
