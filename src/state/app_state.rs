//! Main application state management

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::persistence::TimerStore;

use super::{
    timer_record::{TimerMapping, TimerRecord, UserId},
    transitions,
    transitions::TimerCommand,
};

/// Current wall-clock time in unix milliseconds.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// One emission of a running timer's derived total. Carries the committed
/// record so observers never recompute wall-clock math themselves.
#[derive(Debug, Clone)]
pub struct TimerTick {
    pub user_id: UserId,
    pub total_ms: u64,
    pub record: TimerRecord,
}

/// Main application state: the timer mapping, its persistence port, and the
/// per-identifier tick streams.
pub struct AppState {
    /// The committed timer mapping. The only shared mutable state; all
    /// writes go through the transition functions.
    pub timers: Arc<Mutex<TimerMapping>>,
    /// Durable snapshot slot, written after every committed mutation.
    pub store: Arc<dyn TimerStore>,
    /// Live tick streams, one per running identifier.
    pub tickers: Mutex<HashMap<UserId, JoinHandle<()>>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Publishes the full mapping after every committed mutation
    pub mapping_update_tx: watch::Sender<TimerMapping>,
    /// Keep the receiver alive to prevent channel closure
    pub _mapping_update_rx: watch::Receiver<TimerMapping>,
    /// Publishes derived totals for running timers, once per tick
    pub tick_tx: broadcast::Sender<TimerTick>,
}

impl AppState {
    /// Create a new AppState backed by the given snapshot store.
    pub fn new(port: u16, host: String, store: Arc<dyn TimerStore>) -> Self {
        let (mapping_update_tx, mapping_update_rx) = watch::channel(TimerMapping::new());
        let (tick_tx, _) = broadcast::channel(100);

        Self {
            timers: Arc::new(Mutex::new(TimerMapping::new())),
            store,
            tickers: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            mapping_update_tx,
            _mapping_update_rx: mapping_update_rx,
            tick_tx,
        }
    }

    /// Apply a mutation to the timer mapping, then persist the snapshot and
    /// notify mapping watchers. The snapshot write happens before the
    /// mutation is acknowledged so a crash loses at most one transition.
    pub fn update_timers<F, R>(&self, action: &str, updater: F) -> Result<R, String>
    where
        F: FnOnce(&mut TimerMapping) -> R,
    {
        // Lock the mapping and apply the update
        let mut timers = self.timers.lock()
            .map_err(|e| format!("Failed to lock timer mapping: {}", e))?;

        let result = updater(&mut timers);
        let snapshot = timers.clone();
        drop(timers); // Release the lock early

        // Update last action tracking
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        // Degraded durability is logged, never fatal; memory stays correct.
        if let Err(e) = self.store.save(&snapshot) {
            warn!("Failed to persist timer snapshot after '{}': {}", action, e);
        }

        if let Err(e) = self.mapping_update_tx.send(snapshot) {
            warn!("Failed to send mapping update: {}", e);
        }

        Ok(result)
    }

    /// Start (or resume) the timer for a user. Re-asserting start on a
    /// running timer keeps its start timestamp.
    pub fn start_timer(&self, user_id: UserId) -> Result<TimerRecord, String> {
        info!("Starting timer for user {}", user_id);
        self.update_timers("start-timer", |timers| {
            let next = transitions::start(timers.get(&user_id), now_ms());
            timers.insert(user_id, next.clone());
            next
        })
    }

    /// Stop the timer for a user, banking the elapsed run segment. Cancels
    /// the tick stream at the same instant as the transition. Stopping an
    /// unknown or idle timer changes nothing.
    pub fn stop_timer(&self, user_id: UserId) -> Result<TimerRecord, String> {
        info!("Stopping timer for user {}", user_id);
        let record = self.update_timers("stop-timer", |timers| {
            let next = match timers.get(&user_id) {
                Some(prev) => transitions::stop(prev, now_ms()),
                None => TimerRecord::idle(),
            };
            timers.insert(user_id, next.clone());
            next
        })?;
        self.cancel_ticker(user_id);
        Ok(record)
    }

    /// Reset the timer for a user to a zeroed idle record, cancelling its
    /// tick stream.
    pub fn reset_timer(&self, user_id: UserId) -> Result<TimerRecord, String> {
        info!("Resetting timer for user {}", user_id);
        let record = self.update_timers("reset-timer", |timers| {
            let next = transitions::reset();
            timers.insert(user_id, next.clone());
            next
        })?;
        self.cancel_ticker(user_id);
        Ok(record)
    }

    /// Emit the derived total for a running timer. Does not mutate the
    /// committed record and does not persist; the run segment is only
    /// banked by a stop. Returns `None` when the timer is absent or idle,
    /// which is the ticker's signal to shut its stream down.
    pub fn tick_timer(&self, user_id: UserId) -> Result<Option<TimerTick>, String> {
        let timers = self.timers.lock()
            .map_err(|e| format!("Failed to lock timer mapping: {}", e))?;

        match timers.get(&user_id) {
            Some(record) if record.is_running => {
                let tick = TimerTick {
                    user_id,
                    total_ms: record.derived_total(now_ms()),
                    record: record.clone(),
                };
                // Emitted while the mapping is locked, so a stop cannot
                // land between the liveness check and the emission.
                if self.tick_tx.send(tick.clone()).is_err() {
                    debug!("No tick subscribers for user {}", user_id);
                }
                Ok(Some(tick))
            }
            _ => Ok(None),
        }
    }

    /// Apply a named command through the transition functions. The returned
    /// record is the committed one, except for `Tick`, which is read-only
    /// and returns the record it observed.
    pub fn dispatch(&self, command: TimerCommand) -> Result<Option<TimerRecord>, String> {
        match command {
            TimerCommand::Start { user_id } => self.start_timer(user_id).map(Some),
            TimerCommand::Stop { user_id } => self.stop_timer(user_id).map(Some),
            TimerCommand::Reset { user_id } => self.reset_timer(user_id).map(Some),
            TimerCommand::Tick { user_id, .. } => {
                Ok(self.tick_timer(user_id)?.map(|tick| tick.record))
            }
            TimerCommand::Rehydrate { user_id, record } => {
                let revived = transitions::rehydrate(&record, now_ms());
                self.update_timers("initialize-timer", |timers| {
                    timers.insert(user_id, revived.clone());
                    Some(revived)
                })
            }
        }
    }

    /// Adopt a batch of rehydrated records as one committed mutation.
    pub fn adopt_rehydrated(&self, action: &str, revived: TimerMapping) -> Result<(), String> {
        self.update_timers(action, |timers| {
            for (user_id, record) in revived {
                timers.insert(user_id, record);
            }
        })
    }

    /// Get the committed record for a user, if any.
    pub fn get_timer(&self, user_id: UserId) -> Result<Option<TimerRecord>, String> {
        self.timers.lock()
            .map(|timers| timers.get(&user_id).cloned())
            .map_err(|e| format!("Failed to lock timer mapping: {}", e))
    }

    /// Get the entire committed mapping.
    pub fn all_timers(&self) -> Result<TimerMapping, String> {
        self.timers.lock()
            .map(|timers| timers.clone())
            .map_err(|e| format!("Failed to lock timer mapping: {}", e))
    }

    /// Number of currently running timers.
    pub fn running_count(&self) -> Result<usize, String> {
        self.timers.lock()
            .map(|timers| timers.values().filter(|r| r.is_running).count())
            .map_err(|e| format!("Failed to lock timer mapping: {}", e))
    }

    /// Abort and forget the tick stream for a user, if one is live.
    pub fn cancel_ticker(&self, user_id: UserId) {
        let handle = match self.tickers.lock() {
            Ok(mut tickers) => tickers.remove(&user_id),
            Err(e) => {
                warn!("Failed to lock ticker arena: {}", e);
                return;
            }
        };
        if let Some(handle) = handle {
            handle.abort();
            debug!("Cancelled tick stream for user {}", user_id);
        }
    }

    /// Subscribe to per-tick derived totals.
    pub fn subscribe_ticks(&self) -> broadcast::Receiver<TimerTick> {
        self.tick_tx.subscribe()
    }

    /// Subscribe to committed-mapping updates.
    pub fn watch_mapping(&self) -> watch::Receiver<TimerMapping> {
        self.mapping_update_tx.subscribe()
    }

    /// Write the current mapping to the store outside the per-mutation
    /// path, e.g. on graceful shutdown.
    pub fn save_snapshot(&self) -> Result<(), String> {
        let snapshot = self.all_timers()?;
        self.store.save(&snapshot)
            .map_err(|e| format!("Failed to save timer snapshot: {}", e))
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::JsonFileStore;

    fn app_state(dir: &tempfile::TempDir) -> AppState {
        let store = Arc::new(JsonFileStore::new(dir.path().join("timers_state.json")));
        AppState::new(0, "127.0.0.1".to_string(), store)
    }

    #[test]
    fn start_creates_and_persists_a_running_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        let record = state.start_timer(7).unwrap();
        assert!(record.is_running);
        assert!(record.is_consistent());

        // Every committed mutation lands in the store before returning.
        let persisted = state.store.load();
        assert_eq!(persisted.get(&7), Some(&record));
    }

    #[test]
    fn double_start_keeps_the_original_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        let first = state.start_timer(1).unwrap();
        let second = state.start_timer(1).unwrap();
        assert_eq!(second.start_timestamp, first.start_timestamp);
    }

    #[test]
    fn stop_banks_time_and_persists_an_idle_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        state.start_timer(3).unwrap();
        let stopped = state.stop_timer(3).unwrap();
        assert!(!stopped.is_running);
        assert_eq!(stopped.start_timestamp, None);

        let persisted = state.store.load();
        assert_eq!(persisted.get(&3), Some(&stopped));
    }

    #[test]
    fn stop_on_unknown_user_is_a_harmless_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        let record = state.stop_timer(99).unwrap();
        assert_eq!(record, TimerRecord::idle());
    }

    #[test]
    fn reset_zeroes_the_record_regardless_of_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        state.start_timer(5).unwrap();
        let record = state.reset_timer(5).unwrap();
        assert_eq!(record, TimerRecord::idle());
        assert_eq!(state.get_timer(5).unwrap(), Some(TimerRecord::idle()));
    }

    #[test]
    fn mutations_publish_the_full_mapping_to_watchers() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        let rx = state.watch_mapping();

        state.start_timer(11).unwrap();
        let mapping = rx.borrow();
        assert!(mapping.get(&11).map(|r| r.is_running).unwrap_or(false));
    }

    #[test]
    fn tick_observes_but_never_mutates_the_committed_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        let started = state.start_timer(7).unwrap();
        let tick = state.tick_timer(7).unwrap().unwrap();
        assert_eq!(tick.record, started);
        assert!(tick.total_ms >= started.accumulated_time);
        assert_eq!(state.get_timer(7).unwrap(), Some(started));
    }

    #[test]
    fn tick_on_an_idle_timer_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        state.start_timer(4).unwrap();
        state.stop_timer(4).unwrap();
        assert!(state.tick_timer(4).unwrap().is_none());
        assert!(state.tick_timer(12345).unwrap().is_none());
    }

    #[test]
    fn dispatch_routes_commands_through_the_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        let started = state
            .dispatch(TimerCommand::Start { user_id: 9 })
            .unwrap()
            .unwrap();
        assert!(started.is_running);

        let reset = state
            .dispatch(TimerCommand::Reset { user_id: 9 })
            .unwrap()
            .unwrap();
        assert_eq!(reset, TimerRecord::idle());
    }

    #[test]
    fn a_failed_store_write_keeps_memory_authoritative() {
        // A path inside a directory that does not exist makes every save fail.
        let store = Arc::new(JsonFileStore::new("/nonexistent-dir/timers.json"));
        let state = AppState::new(0, "127.0.0.1".to_string(), store);

        let record = state.start_timer(2).unwrap();
        assert!(record.is_running);
        assert_eq!(state.get_timer(2).unwrap(), Some(record));
    }
}
