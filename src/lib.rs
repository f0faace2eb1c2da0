//! Timecard - A state-managed HTTP server tracking per-user elapsed time
//!
//! This library tracks, for an arbitrary set of user identifiers, whether a
//! timer is running and how much time it has accumulated, and resumes
//! counting correctly after the process is closed and reopened using a
//! persisted snapshot and wall-clock arithmetic.

pub mod api;
pub mod config;
pub mod persistence;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use persistence::{JsonFileStore, TimerStore};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
