//! Integration tests for startup recovery and the retention sweep.
//!
//! Covers orphan recovery, history pruning and the combined sweep, both on
//! the in-memory backend and on a SQLite file.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use regrow_core::recovery::{
    abandon_orphaned_sessions, prune_sessions, startup_sweep, RetentionPolicy, MAX_SESSIONS,
    PRUNE_TARGET,
};
use regrow_core::storage::SqliteKv;
use regrow_core::{Clock, ManualClock, Session, SessionManager, SessionStatus, Store};

fn base() -> DateTime<Utc> {
    "2025-01-01T00:00:00Z".parse().unwrap()
}

fn history(count: usize) -> Vec<Session> {
    (0..count)
        .map(|i| {
            let mut s = Session::begin("goal-1", base() + Duration::seconds(i as i64));
            s.status = SessionStatus::Completed;
            s.current_reps = 10;
            s
        })
        .collect()
}

#[test]
fn test_history_over_high_water_mark_keeps_most_recent() {
    let store = Store::in_memory();
    let sessions = history(MAX_SESSIONS + 1);
    assert!(store.save_sessions(&sessions));

    let report = prune_sessions(&store, RetentionPolicy::default());
    assert_eq!(report.before, 5001);
    assert_eq!(report.after, PRUNE_TARGET);
    assert_eq!(report.removed(), 1001);

    let kept = store.sessions();
    assert_eq!(kept.len(), 4000);
    let oldest_kept = kept.iter().map(|s| s.started_at).min().unwrap();
    assert_eq!(oldest_kept, base() + Duration::seconds(1001));
    assert!(kept.iter().any(|s| s.id == sessions[5000].id));
    assert!(!kept.iter().any(|s| s.id == sessions[1000].id));
}

#[test]
fn test_history_at_high_water_mark_is_untouched() {
    let store = Store::in_memory();
    assert!(store.save_sessions(&history(MAX_SESSIONS)));
    let report = prune_sessions(&store, RetentionPolicy::default());
    assert_eq!(report.removed(), 0);
    assert_eq!(store.sessions().len(), MAX_SESSIONS);
}

#[test]
fn test_orphans_abandoned_with_last_known_progress() {
    let clock = ManualClock::at_epoch_2025();
    let manager = SessionManager::new(Store::in_memory().shared(), clock.shared());
    let orphan = manager.start_session("goal-1");
    let finished = manager.start_session("goal-1");
    clock.advance_secs(30);
    assert!(manager.complete_session(&finished.id, 5, 30));

    clock.advance_secs(3600);
    let report = abandon_orphaned_sessions(manager.store(), clock.now());
    assert_eq!(report.total_sessions, 2);
    assert_eq!(report.abandoned, vec![orphan.id.clone()]);
    assert!(report.persisted);

    let store = manager.store();
    let recovered = store.session(&orphan.id).unwrap();
    assert_eq!(recovered.status, SessionStatus::Abandoned);
    assert_eq!(recovered.completed_at, Some(clock.now()));
    assert_eq!(recovered.current_reps, 0);
    let untouched = store.session(&finished.id).unwrap();
    assert_eq!(untouched.status, SessionStatus::Completed);
    assert_eq!(untouched.elapsed_seconds, 30);
}

#[test]
fn test_sweep_on_sqlite_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("regrow.db");
    let clock = ManualClock::at_epoch_2025();
    clock.advance_secs(86_400);

    let orphan_id = {
        let store = Store::new(SqliteKv::open_path(&path).unwrap());
        let mut sessions = history(MAX_SESSIONS + 10);
        let orphan = Session::begin("goal-2", clock.now());
        sessions.push(orphan.clone());
        assert!(store.save_sessions(&sessions));
        assert!(store.set_calendar_visible(true));
        orphan.id
    };

    let store = Store::new(SqliteKv::open_path(&path).unwrap());
    let report = startup_sweep(&store, &clock, RetentionPolicy::default());
    assert_eq!(report.recovery.abandoned, vec![orphan_id.clone()]);
    assert_eq!(report.prune.after, PRUNE_TARGET);

    let reopened = Store::new(SqliteKv::open_path(&path).unwrap());
    let sessions = reopened.sessions();
    assert_eq!(sessions.len(), PRUNE_TARGET);
    // The orphan is the newest session and survives pruning as abandoned.
    let orphan = sessions.iter().find(|s| s.id == orphan_id).unwrap();
    assert_eq!(orphan.status, SessionStatus::Abandoned);
    assert!(sessions.iter().all(|s| !s.is_active()));
    assert!(reopened.calendar_visible());
}

#[test]
fn test_second_sweep_is_a_noop() {
    let clock = ManualClock::at_epoch_2025();
    let store = Store::in_memory();
    let mut sessions = history(MAX_SESSIONS + 1);
    sessions.push(Session::begin("goal-1", clock.now()));
    assert!(store.save_sessions(&sessions));

    startup_sweep(&store, &clock, RetentionPolicy::default());
    let again = startup_sweep(&store, &clock, RetentionPolicy::default());
    assert!(again.recovery.abandoned.is_empty());
    assert_eq!(again.prune.removed(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_prune_keeps_newest_target(
        offsets in prop::collection::hash_set(0i64..1_000_000, 1..120),
        max in 1usize..60,
        keep in 1usize..60,
    ) {
        let policy = RetentionPolicy { max_sessions: max, prune_target: keep.min(max) };
        let store = Store::in_memory();
        let sessions: Vec<Session> = offsets
            .iter()
            .map(|o| Session::begin("g", base() + Duration::seconds(*o)))
            .collect();
        prop_assert!(store.save_sessions(&sessions));

        prune_sessions(&store, policy);
        let kept = store.sessions();

        if sessions.len() <= policy.max_sessions {
            prop_assert_eq!(kept.len(), sessions.len());
        } else {
            prop_assert_eq!(kept.len(), policy.prune_target);
            let mut starts: Vec<_> = sessions.iter().map(|s| s.started_at).collect();
            starts.sort_by(|a, b| b.cmp(a));
            let cutoff = starts[policy.prune_target - 1];
            prop_assert!(kept.iter().all(|s| s.started_at >= cutoff));
        }
    }
}
