//! Timer record data model

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identifier of the user a timer belongs to. Timers are keyed by the raw
/// identifier and do not care whether a matching user entity exists anywhere.
pub type UserId = u64;

/// The full set of timers, keyed by user identifier. This is the unit of
/// persistence: the whole mapping is written as one JSON object.
pub type TimerMapping = HashMap<UserId, TimerRecord>;

/// Elapsed-time tracker for one user.
///
/// `start_timestamp` is present exactly when `is_running` is true; it marks
/// the wall-clock start (unix milliseconds) of the current run segment.
/// `accumulated_time` holds the milliseconds banked by previous segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    pub accumulated_time: u64,
    pub is_running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<u64>,
}

impl TimerRecord {
    /// A fresh idle record with nothing banked.
    pub fn idle() -> Self {
        Self {
            accumulated_time: 0,
            is_running: false,
            start_timestamp: None,
        }
    }

    /// Check the `is_running` <=> `start_timestamp` invariant.
    pub fn is_consistent(&self) -> bool {
        self.is_running == self.start_timestamp.is_some()
    }

    /// Display-only total elapsed time at wall-clock `now_ms`: the banked
    /// time plus the live segment, without banking anything.
    pub fn derived_total(&self, now_ms: u64) -> u64 {
        match self.start_timestamp {
            Some(start) if self.is_running => {
                self.accumulated_time + now_ms.saturating_sub(start)
            }
            _ => self.accumulated_time,
        }
    }
}

impl Default for TimerRecord {
    fn default() -> Self {
        Self::idle()
    }
}
