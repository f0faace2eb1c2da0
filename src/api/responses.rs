//! API response structures

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{now_ms, TimerMapping, TimerRecord, UserId};

/// Read projection of one timer: the committed record plus its current
/// derived total, so clients never do wall-clock math themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub user_id: UserId,
    pub accumulated_time: u64,
    pub is_running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<u64>,
    pub total_ms: u64,
}

impl TimerView {
    pub fn of(user_id: UserId, record: &TimerRecord) -> Self {
        Self {
            user_id,
            accumulated_time: record.accumulated_time,
            is_running: record.is_running,
            start_timestamp: record.start_timestamp,
            total_ms: record.derived_total(now_ms()),
        }
    }
}

/// API response structure for timer operation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerView,
}

impl TimerResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, timer: TimerView) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    /// Create a response for a running timer
    pub fn running(message: String, timer: TimerView) -> Self {
        Self::new("running".to_string(), message, timer)
    }

    /// Create a response for an idle timer
    pub fn idle(message: String, timer: TimerView) -> Self {
        Self::new("idle".to_string(), message, timer)
    }

    /// Pick the status from the timer itself
    pub fn for_timer(message: String, timer: TimerView) -> Self {
        if timer.is_running {
            Self::running(message, timer)
        } else {
            Self::idle(message, timer)
        }
    }
}

/// Full-mapping projection returned by GET /timers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimersResponse {
    pub timestamp: DateTime<Utc>,
    pub timers: HashMap<UserId, TimerView>,
}

impl TimersResponse {
    pub fn of(mapping: &TimerMapping) -> Self {
        Self {
            timestamp: Utc::now(),
            timers: mapping
                .iter()
                .map(|(&user_id, record)| (user_id, TimerView::of(user_id, record)))
                .collect(),
        }
    }
}

/// Service status response with timer counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub total_timers: usize,
    pub running_timers: usize,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: "0.1.0".to_string(),
        }
    }
}
