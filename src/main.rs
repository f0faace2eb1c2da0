//! Timecard - A state-managed HTTP server tracking per-user elapsed time
//!
//! This is the main entry point for the timecard application.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use timecard::{
    api::create_router,
    config::Config,
    persistence::JsonFileStore,
    state::AppState,
    tasks::rehydrate_all,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("timecard={},tower_http=info", config.log_level()))
        .init();

    info!("Starting timecard server v0.1.0");
    info!(
        "Configuration: host={}, port={}, data_file={}",
        config.host,
        config.port,
        config.data_file.display()
    );

    // Create application state over the snapshot store
    let store = Arc::new(JsonFileStore::new(config.data_file.clone()));
    let state = Arc::new(AppState::new(config.port, config.host.clone(), store));

    // Rehydrate persisted timers before accepting any operation, so a
    // fresh start can never race a stale snapshot
    if let Err(e) = rehydrate_all(&state) {
        warn!("Timer rehydration failed, starting empty: {}", e);
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timers/:id/start      - Start (or resume) a user's timer");
    info!("  POST /timers/:id/stop       - Stop a timer and bank its segment");
    info!("  POST /timers/:id/reset      - Reset a timer to zero");
    info!("  POST /timers/:id/initialize - Rehydrate one timer from the snapshot");
    info!("  POST /timers/initialize     - Rehydrate all persisted timers");
    info!("  GET  /timers/:id            - Read one timer with derived total");
    info!("  GET  /timers                - Read all timers");
    info!("  GET  /status                - Service status");
    info!("  GET  /health                - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // One last snapshot so a stop-and-restart loses nothing
    if let Err(e) = state.save_snapshot() {
        warn!("Final snapshot save failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
