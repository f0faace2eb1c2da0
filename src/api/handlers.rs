//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info};

use crate::{
    state::{AppState, UserId},
    tasks::{ensure_ticker, rehydrate_all, rehydrate_one},
};

use super::responses::{HealthResponse, StatusResponse, TimerResponse, TimerView, TimersResponse};

/// Handle POST /timers/:user_id/start - Start (or resume) a timer
pub async fn start_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<TimerResponse>, StatusCode> {
    match state.start_timer(user_id) {
        Ok(record) => {
            ensure_ticker(&state, user_id);
            info!("Timer started for user {}", user_id);
            Ok(Json(TimerResponse::running(
                format!("Timer started for user {}", user_id),
                TimerView::of(user_id, &record),
            )))
        }
        Err(e) => {
            error!("Failed to start timer for user {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /timers/:user_id/stop - Stop a timer and bank its segment
pub async fn stop_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<TimerResponse>, StatusCode> {
    match state.stop_timer(user_id) {
        Ok(record) => {
            info!(
                "Timer stopped for user {} at {}ms banked",
                user_id, record.accumulated_time
            );
            Ok(Json(TimerResponse::idle(
                format!("Timer stopped for user {}", user_id),
                TimerView::of(user_id, &record),
            )))
        }
        Err(e) => {
            error!("Failed to stop timer for user {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /timers/:user_id/reset - Reset a timer to zero
pub async fn reset_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<TimerResponse>, StatusCode> {
    match state.reset_timer(user_id) {
        Ok(record) => {
            info!("Timer reset for user {}", user_id);
            Ok(Json(TimerResponse::idle(
                format!("Timer reset for user {}", user_id),
                TimerView::of(user_id, &record),
            )))
        }
        Err(e) => {
            error!("Failed to reset timer for user {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /timers/:user_id/initialize - Rehydrate one timer from the
/// persisted snapshot
pub async fn initialize_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<TimerResponse>, StatusCode> {
    match rehydrate_one(&state, user_id) {
        Ok(Some(record)) => {
            info!("Timer initialized from snapshot for user {}", user_id);
            Ok(Json(TimerResponse::for_timer(
                format!("Timer initialized for user {}", user_id),
                TimerView::of(user_id, &record),
            )))
        }
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to initialize timer for user {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /timers/initialize - Rehydrate every persisted timer
pub async fn initialize_all_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimersResponse>, StatusCode> {
    match rehydrate_all(&state) {
        Ok(resumed) => {
            info!("Rehydration triggered over HTTP, {} timer(s) resumed", resumed);
            match state.all_timers() {
                Ok(mapping) => Ok(Json(TimersResponse::of(&mapping))),
                Err(e) => {
                    error!("Failed to read timers after rehydration: {}", e);
                    Err(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        Err(e) => {
            error!("Failed to rehydrate timers: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /timers/:user_id - Read one timer with its derived total
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<TimerView>, StatusCode> {
    match state.get_timer(user_id) {
        Ok(Some(record)) => Ok(Json(TimerView::of(user_id, &record))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to read timer for user {}: {}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /timers - Read the whole mapping with derived totals
pub async fn list_timers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimersResponse>, StatusCode> {
    match state.all_timers() {
        Ok(mapping) => Ok(Json(TimersResponse::of(&mapping))),
        Err(e) => {
            error!("Failed to read timers: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /status - Return current service status
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let mapping = match state.all_timers() {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to read timers: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        total_timers: mapping.len(),
        running_timers: mapping.values().filter(|r| r.is_running).count(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
