//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timers", get(list_timers_handler))
        .route("/timers/initialize", post(initialize_all_handler))
        .route("/timers/:user_id", get(get_timer_handler))
        .route("/timers/:user_id/start", post(start_timer_handler))
        .route("/timers/:user_id/stop", post(stop_timer_handler))
        .route("/timers/:user_id/reset", post(reset_timer_handler))
        .route("/timers/:user_id/initialize", post(initialize_timer_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
