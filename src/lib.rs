//! tagshelf: library manager for proximity-tag audio playback boxes
//!
//! Keeps three independently-evolving data sources mutually consistent:
//! the content file store, the custom/official metadata catalog, and
//! per-tag hardware state files. The reconciliation engine cross-references
//! them through imperfect keys and exposes content-centric and tag-centric
//! views over HTTP.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod services;

pub use error::{Error, Result};

use config::Config;
use services::catalog::CatalogStore;
use services::hub::HubClient;
use services::reconcile::ReconcileEngine;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: HubClient,
    pub engine: Arc<ReconcileEngine>,
    pub catalog: Arc<CatalogStore>,
}

impl AppState {
    /// Wire up all components from configuration (dependency injection;
    /// tests construct the same state over fixture directories).
    pub fn new(config: Config) -> Self {
        let hub = HubClient::new(&config.hub);
        let engine = ReconcileEngine::new(&config, hub.clone());
        let catalog = CatalogStore::new(config.volumes.config_path());
        Self {
            config: Arc::new(config),
            hub,
            engine: Arc::new(engine),
            catalog: Arc::new(catalog),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/status", get(api::status::get_status))
        .route("/api/hub/reload", post(api::status::reload_hub))
        .route("/api/library", get(api::library::get_library))
        .route("/api/tags", get(api::tags::get_tags))
        .route("/api/tags/boxes", get(api::tags::get_boxes))
        .route("/api/tags/link", post(api::tags::link_tag))
        .route("/api/tags/box/:box_id", get(api::tags::get_box_tags))
        .route(
            "/api/tags/box/:box_id/last-played",
            get(api::tags::get_last_played),
        )
        .route(
            "/api/entries",
            get(api::entries::list_entries).post(api::entries::create_entry),
        )
        .route("/api/entries/next-model", get(api::entries::next_model))
        .route(
            "/api/entries/:no",
            get(api::entries::get_entry)
                .put(api::entries::update_entry)
                .delete(api::entries::delete_entry),
        );

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
