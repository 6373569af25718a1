//! tagshelf - Library manager for proximity-tag audio playback boxes
//!
//! Single-binary HTTP service mediating between the box's device-cloud
//! service ("hub"), the content library on disk, and per-tag hardware
//! state files.

use anyhow::Result;
use tracing::info;

use tagshelf::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init, before any
    // filesystem or network delays.
    info!(
        "Starting tagshelf v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config_path = tagshelf::config::config_file_path();
    let config = tagshelf::config::load(&config_path);
    let bind_addr = config.app.bind_addr.clone();

    let state = AppState::new(config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("tagshelf listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
