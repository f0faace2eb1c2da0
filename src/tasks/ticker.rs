//! Per-user tick streams

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info};

use crate::state::{AppState, UserId};

/// Cadence at which running timers publish their derived total.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Attach a tick stream to a running timer, unless one is already live.
/// One stream per identifier: a re-asserted start while the stream is
/// still up must not double up emissions for downstream consumers.
pub fn ensure_ticker(state: &Arc<AppState>, user_id: UserId) {
    let mut tickers = match state.tickers.lock() {
        Ok(tickers) => tickers,
        Err(e) => {
            error!("Failed to lock ticker arena: {}", e);
            return;
        }
    };

    if let Some(handle) = tickers.get(&user_id) {
        if !handle.is_finished() {
            debug!("Tick stream for user {} already live", user_id);
            return;
        }
    }

    let task_state = Arc::clone(state);
    let handle = tokio::spawn(async move {
        run_ticker(task_state, user_id).await;
    });
    tickers.insert(user_id, handle);
    info!("Attached tick stream for user {}", user_id);
}

/// Emit the derived total for one user every second until the record is no
/// longer running. The liveness check and the emission happen atomically
/// inside `tick_timer`, so a stop that lands between two ticks can never be
/// followed by a stale emission.
async fn run_ticker(state: Arc<AppState>, user_id: UserId) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    // The first interval tick completes immediately; skip it so emissions
    // land on whole-second boundaries after the start.
    interval.tick().await;

    loop {
        interval.tick().await;

        match state.tick_timer(user_id) {
            Ok(Some(tick)) => {
                debug!(
                    "Tick for user {}: total {}ms (banked {}ms)",
                    user_id, tick.total_ms, tick.record.accumulated_time
                );
            }
            Ok(None) => {
                debug!("Timer for user {} is idle, ending tick stream", user_id);
                break;
            }
            Err(e) => {
                error!("Tick stream for user {} failed: {}", user_id, e);
                break;
            }
        }
    }
}
