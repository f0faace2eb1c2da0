//! State management module
//!
//! This module contains the timer data model, the pure transition
//! functions, and the shared application state that applies them.

pub mod app_state;
pub mod timer_record;
pub mod transitions;

// Re-export main types
pub use app_state::{now_ms, AppState, TimerTick};
pub use timer_record::{TimerMapping, TimerRecord, UserId};
pub use transitions::TimerCommand;
