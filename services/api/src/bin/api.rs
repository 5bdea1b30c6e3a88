//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{ChimeCue, JsonFileRepository},
    config::Config,
    error::ApiError,
    web::{build_router, state::AppState},
};
use pomodoro_core::TaskStore;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the JSON Document ---
    let repo = Arc::new(JsonFileRepository::new(config.db_path.clone()));
    info!("Opening document at {}", repo.path().display());
    repo.init().await?;
    let store = Arc::new(TaskStore::new(repo));

    // --- 3. Completion Cue ---
    let chime = if config.chime_enabled {
        Some(Arc::new(ChimeCue::new()?))
    } else {
        info!("Completion chime disabled.");
        None
    };

    // --- 4. Build the Shared AppState and Router ---
    let app_state = Arc::new(AppState::new(store, config.clone(), chime));
    let app = build_router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
