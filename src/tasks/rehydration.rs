//! Startup rehydration of persisted timers

use std::sync::Arc;

use tracing::{debug, info};

use crate::state::{now_ms, transitions, AppState, TimerMapping, TimerRecord, UserId};

use super::ticker::ensure_ticker;

/// Load the persisted snapshot and reconcile every entry: timers left
/// running have their downtime rolled forward and resume live ticking
/// without any user action. Runs once at startup, before the HTTP listener
/// accepts operations, so a fresh start can never race a stale snapshot.
/// Returns the number of timers that resumed running.
pub fn rehydrate_all(state: &Arc<AppState>) -> Result<usize, String> {
    let persisted = state.store.load();
    if persisted.is_empty() {
        info!("No persisted timers to rehydrate");
        return Ok(0);
    }

    let now = now_ms();
    let revived: TimerMapping = persisted
        .iter()
        .map(|(&user_id, record)| (user_id, transitions::rehydrate(record, now)))
        .collect();

    let resumed: Vec<UserId> = revived
        .iter()
        .filter(|(_, record)| record.is_running)
        .map(|(&user_id, _)| user_id)
        .collect();

    state.adopt_rehydrated("rehydrate-timers", revived)?;

    for &user_id in &resumed {
        ensure_ticker(state, user_id);
    }

    info!(
        "Rehydrated {} timer(s), {} resumed running",
        persisted.len(),
        resumed.len()
    );
    Ok(resumed.len())
}

/// Reconcile a single identifier from the persisted snapshot. Returns the
/// adopted record, or `None` when the snapshot has no entry for it.
pub fn rehydrate_one(
    state: &Arc<AppState>,
    user_id: UserId,
) -> Result<Option<TimerRecord>, String> {
    let persisted = state.store.load();
    let Some(record) = persisted.get(&user_id) else {
        debug!("No persisted timer for user {}", user_id);
        return Ok(None);
    };

    let revived = transitions::rehydrate(record, now_ms());
    state.update_timers("initialize-timer", |timers| {
        timers.insert(user_id, revived.clone());
    })?;

    if revived.is_running {
        ensure_ticker(state, user_id);
    }
    Ok(Some(revived))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{JsonFileStore, TimerStore};

    fn seeded_state(dir: &tempfile::TempDir, snapshot: &TimerMapping) -> Arc<AppState> {
        let store = Arc::new(JsonFileStore::new(dir.path().join("timers_state.json")));
        store.save(snapshot).unwrap();
        Arc::new(AppState::new(0, "127.0.0.1".to_string(), store))
    }

    #[tokio::test]
    async fn running_timers_catch_up_on_downtime_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshot = TimerMapping::new();
        snapshot.insert(
            7,
            TimerRecord {
                accumulated_time: 5_000,
                is_running: true,
                start_timestamp: Some(now_ms() - 3_000),
            },
        );
        let state = seeded_state(&dir, &snapshot);

        let resumed = rehydrate_all(&state).unwrap();
        assert_eq!(resumed, 1);

        let record = state.get_timer(7).unwrap().unwrap();
        assert!(record.is_running);
        // 3s of downtime rolled into the banked time, fresh segment start.
        assert!(record.accumulated_time >= 8_000);
        assert!(record.accumulated_time < 9_000);
        assert!(record.start_timestamp.unwrap() >= now_ms() - 1_000);

        // The resumed timer got its tick stream back.
        assert!(state.tickers.lock().unwrap().contains_key(&7));
    }

    #[tokio::test]
    async fn idle_timers_are_adopted_unchanged_without_streams() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshot = TimerMapping::new();
        let idle = TimerRecord {
            accumulated_time: 4_200,
            is_running: false,
            start_timestamp: None,
        };
        snapshot.insert(3, idle.clone());
        let state = seeded_state(&dir, &snapshot);

        let resumed = rehydrate_all(&state).unwrap();
        assert_eq!(resumed, 0);
        assert_eq!(state.get_timer(3).unwrap(), Some(idle));
        assert!(state.tickers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_snapshot_rehydrates_to_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(&dir, &TimerMapping::new());
        assert_eq!(rehydrate_all(&state).unwrap(), 0);
        assert!(state.all_timers().unwrap().is_empty());
    }

    #[tokio::test]
    async fn single_identifier_rehydration_only_touches_that_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshot = TimerMapping::new();
        snapshot.insert(
            1,
            TimerRecord {
                accumulated_time: 100,
                is_running: false,
                start_timestamp: None,
            },
        );
        snapshot.insert(
            2,
            TimerRecord {
                accumulated_time: 200,
                is_running: false,
                start_timestamp: None,
            },
        );
        let state = seeded_state(&dir, &snapshot);

        let revived = rehydrate_one(&state, 1).unwrap().unwrap();
        assert_eq!(revived.accumulated_time, 100);
        assert_eq!(state.get_timer(2).unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_identifier_rehydrates_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(&dir, &TimerMapping::new());
        assert_eq!(rehydrate_one(&state, 42).unwrap(), None);
    }
}
