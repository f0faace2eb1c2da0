//! Background tasks module
//!
//! This module contains the per-timer tick streams and the startup
//! rehydration that run alongside the HTTP server.

pub mod rehydration;
pub mod ticker;

// Re-export main functions
pub use rehydration::{rehydrate_all, rehydrate_one};
pub use ticker::ensure_ticker;
