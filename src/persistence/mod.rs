//! Timer snapshot persistence
//!
//! The whole timer mapping is saved as one JSON object in a single durable
//! slot. The store is an injected port so the state machine and the tasks
//! can be exercised without touching real storage.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, warn};

use crate::state::TimerMapping;

/// Durable slot for the timer mapping.
///
/// `load` never fails: a missing or unparseable snapshot yields an empty
/// mapping, because the rest of the application must not depend on timer
/// data integrity. `save` failures are surfaced so the caller can log the
/// degraded durability, but in-memory state stays authoritative.
pub trait TimerStore: Send + Sync {
    fn load(&self) -> TimerMapping;
    fn save(&self, timers: &TimerMapping) -> anyhow::Result<()>;
}

/// File-backed store: one JSON file holding the serialized mapping.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl TimerStore for JsonFileStore {
    fn load(&self) -> TimerMapping {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No timer snapshot at {}: {}", self.path.display(), e);
                return TimerMapping::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(
                    "Discarding unparseable timer snapshot at {}: {}",
                    self.path.display(),
                    e
                );
                TimerMapping::new()
            }
        }
    }

    fn save(&self, timers: &TimerMapping) -> anyhow::Result<()> {
        let json = serde_json::to_string(timers)
            .context("failed to serialize timer mapping")?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write timer snapshot to {}", self.path.display()))
    }
}
