//! Pagination utilities shared by all list endpoints
//!
//! Endpoints take `skip`/`limit` query parameters and return an envelope
//! carrying the page slice plus metadata, so a caller can always distinguish
//! "no items" from "failed to load" via the `success`/`error` pair on the
//! response types that embed this.

use serde::{Deserialize, Serialize};

/// Default page size for all list endpoints
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Query parameters for paginated endpoints
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    /// Number of items to skip (offset)
    #[serde(default)]
    pub skip: usize,
    /// Maximum number of items to return
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Page metadata calculated from the full result size
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageInfo {
    /// Current page number (1-indexed)
    pub page: usize,
    /// Requested page size
    pub page_size: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Slice `items` to the requested page and compute metadata.
///
/// The returned item count is always `min(limit, max(0, total - skip))`;
/// `has_next` is `skip + limit < total`.
pub fn paginate<T: Clone>(items: &[T], params: PageParams) -> (Vec<T>, PageInfo) {
    let total = items.len();
    let page_items: Vec<T> = items
        .iter()
        .skip(params.skip)
        .take(params.limit)
        .cloned()
        .collect();

    let page = if params.limit > 0 {
        params.skip / params.limit + 1
    } else {
        1
    };

    let info = PageInfo {
        page,
        page_size: params.limit,
        has_next: params.skip + params.limit < total,
        has_prev: params.skip > 0,
    };
    (page_items, info)
}
