//! Content-centric library view
//!
//! The primary management surface: every content file in the library with
//! the catalog entry (if any) it links to, orphans included.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::ContentFileView;
use crate::pagination::{paginate, PageParams, DEFAULT_PAGE_SIZE};
use crate::AppState;

/// Query parameters for the library view
#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Invalidate the cached scan and rescan before answering
    #[serde(default)]
    pub refresh: bool,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Paginated content-centric response. `success`/`error` let callers
/// distinguish an empty library from a failed load.
#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub items: Vec<ContentFileView>,
    /// Total content files (unfiltered)
    pub total_count: usize,
    pub linked_count: usize,
    pub orphaned_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub success: bool,
    pub error: Option<String>,
}

/// GET /api/library
pub async fn get_library(
    State(state): State<AppState>,
    Query(query): Query<LibraryQuery>,
) -> Json<LibraryResponse> {
    let linkage = state.engine.content_linkage(query.refresh).await;
    let (items, info) = paginate(
        &linkage.files,
        PageParams {
            skip: query.skip,
            limit: query.limit,
        },
    );

    Json(LibraryResponse {
        items,
        total_count: linkage.total_count,
        linked_count: linkage.linked_count,
        orphaned_count: linkage.orphaned_count,
        page: info.page,
        page_size: info.page_size,
        has_next: info.has_next,
        has_prev: info.has_prev,
        success: true,
        error: None,
    })
}
