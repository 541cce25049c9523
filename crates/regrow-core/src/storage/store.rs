//! Goal and session collections over a key-value backend.
//!
//! Each collection is a JSON array stored under a well-known key and is
//! replaced as a whole on every write. Mutations run as one backend
//! read-modify-write, so writers in other processes cannot interleave. The
//! store never returns an error to its callers:
//! - a failed write is logged and reported as `false`
//! - a missing or malformed collection reads as empty
//! - a failed read aborts a mutation before anything is written
//! - updating an unknown id is a no-op that returns `false`
//!
//! Readers always get owned copies.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::kv::{KvBackend, MemoryKv, SqliteKv};
use crate::error::StorageError;
use crate::goals::{Goal, GoalUpdate};
use crate::session::{Session, SessionUpdate};

pub const GOALS_KEY: &str = "regrow_goals";
pub const SESSIONS_KEY: &str = "regrow_sessions";
pub const CALENDAR_VISIBLE_KEY: &str = "regrow_calendar_visible";

pub type SharedStore = Arc<Store>;

pub struct Store {
    backend: Mutex<Box<dyn KvBackend>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    pub fn new(backend: impl KvBackend + 'static) -> Self {
        Self {
            backend: Mutex::new(Box::new(backend)),
        }
    }

    /// Open the SQLite store in the data directory.
    pub fn open(file_name: &str) -> Result<Self, StorageError> {
        Ok(Self::new(SqliteKv::open(file_name)?))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryKv::new())
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }

    // ── Sessions ─────────────────────────────────────────────────────

    pub fn sessions(&self) -> Vec<Session> {
        self.read(SESSIONS_KEY)
    }

    pub fn save_sessions(&self, sessions: &[Session]) -> bool {
        self.write(SESSIONS_KEY, sessions)
    }

    /// Read-modify-write of the whole session list. `change` returns whether
    /// to store the result; it is not called when the read fails.
    pub fn modify_sessions<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut Vec<Session>) -> bool,
    {
        self.modify(SESSIONS_KEY, change)
    }

    pub fn session(&self, id: &str) -> Option<Session> {
        self.sessions().into_iter().find(|s| s.id == id)
    }

    pub fn sessions_by_goal(&self, goal_id: &str) -> Vec<Session> {
        self.sessions()
            .into_iter()
            .filter(|s| s.goal_id == goal_id)
            .collect()
    }

    pub fn add_session(&self, session: &Session) -> bool {
        self.modify(SESSIONS_KEY, |sessions: &mut Vec<Session>| {
            sessions.push(session.clone());
            true
        })
    }

    pub fn update_session(&self, id: &str, update: &SessionUpdate) -> bool {
        self.modify(SESSIONS_KEY, |sessions: &mut Vec<Session>| {
            let Some(session) = sessions.iter_mut().find(|s| s.id == id) else {
                tracing::debug!(session_id = id, "update for unknown session ignored");
                return false;
            };
            update.apply(session);
            true
        })
    }

    // ── Goals ────────────────────────────────────────────────────────

    pub fn goals(&self) -> Vec<Goal> {
        self.read(GOALS_KEY)
    }

    pub fn save_goals(&self, goals: &[Goal]) -> bool {
        self.write(GOALS_KEY, goals)
    }

    pub fn goal(&self, id: &str) -> Option<Goal> {
        self.goals().into_iter().find(|g| g.id == id)
    }

    pub fn add_goal(&self, goal: &Goal) -> bool {
        self.modify(GOALS_KEY, |goals: &mut Vec<Goal>| {
            goals.push(goal.clone());
            true
        })
    }

    pub fn update_goal(&self, id: &str, update: &GoalUpdate) -> bool {
        self.modify(GOALS_KEY, |goals: &mut Vec<Goal>| {
            let Some(goal) = goals.iter_mut().find(|g| g.id == id) else {
                return false;
            };
            update.apply(goal);
            true
        })
    }

    /// Remove a goal and every session that references it.
    ///
    /// Sessions go first, so a failure in between leaves the goal in place
    /// rather than sessions pointing at a deleted goal.
    pub fn delete_goal(&self, id: &str) -> bool {
        let sessions_ok = self.modify(SESSIONS_KEY, |sessions: &mut Vec<Session>| {
            sessions.retain(|s| s.goal_id != id);
            true
        });
        if !sessions_ok {
            return false;
        }
        self.modify(GOALS_KEY, |goals: &mut Vec<Goal>| {
            goals.retain(|g| g.id != id);
            true
        })
    }

    pub fn increment_completed_count(&self, goal_id: &str, at: DateTime<Utc>) -> bool {
        self.modify(GOALS_KEY, |goals: &mut Vec<Goal>| {
            let Some(goal) = goals.iter_mut().find(|g| g.id == goal_id) else {
                return false;
            };
            goal.completed_count += 1;
            goal.last_completed_at = Some(at);
            true
        })
    }

    // ── Calendar flag ────────────────────────────────────────────────

    /// Hidden unless explicitly turned on.
    pub fn calendar_visible(&self) -> bool {
        match self.get_raw(CALENDAR_VISIBLE_KEY) {
            Some(value) => value == "true",
            None => false,
        }
    }

    pub fn set_calendar_visible(&self, visible: bool) -> bool {
        let value = if visible { "true" } else { "false" };
        self.set_raw(CALENDAR_VISIBLE_KEY, value)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn read<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        parse(key, self.get_raw(key).as_deref())
    }

    /// Apply `change` to the stored collection in one backend transaction.
    ///
    /// `change` returns whether to write. Returns whether the new collection
    /// was stored.
    fn modify<T, F>(&self, key: &str, change: F) -> bool
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> bool,
    {
        let backend = match self.backend.lock() {
            Ok(backend) => backend,
            Err(_) => {
                tracing::warn!(key, "store lock poisoned");
                return false;
            }
        };
        let mut change = Some(change);
        let result = backend.update(key, &mut |raw| {
            let change = change.take()?;
            let mut items: Vec<T> = parse(key, raw.as_deref());
            if !change(&mut items) {
                return None;
            }
            match serde_json::to_string(&items) {
                Ok(json) => Some(json),
                Err(e) => {
                    tracing::warn!(key, error = %e, "failed to serialize collection");
                    None
                }
            }
        });
        match result {
            Ok(written) => written,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage update failed, nothing written");
                false
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, items: &[T]) -> bool {
        match serde_json::to_string(items) {
            Ok(json) => self.set_raw(key, &json),
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to serialize collection");
                false
            }
        }
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        let backend = match self.backend.lock() {
            Ok(backend) => backend,
            Err(_) => {
                tracing::warn!(key, "store lock poisoned");
                return None;
            }
        };
        match backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage read failed");
                None
            }
        }
    }

    fn set_raw(&self, key: &str, value: &str) -> bool {
        let backend = match self.backend.lock() {
            Ok(backend) => backend,
            Err(_) => {
                tracing::warn!(key, "store lock poisoned");
                return false;
            }
        };
        match backend.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage write failed");
                false
            }
        }
    }
}

/// A missing or malformed collection reads as empty.
fn parse<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> Vec<T> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<T>>(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(key, error = %e, "malformed collection, reading as empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalDraft;
    use crate::session::SessionStatus;

    fn memory_store() -> (Arc<MemoryKv>, Store) {
        let kv = Arc::new(MemoryKv::new());
        let store = Store::new(kv.clone());
        (kv, store)
    }

    #[test]
    fn add_and_update_session() {
        let (_kv, store) = memory_store();
        let session = Session::begin("g1", Utc::now());
        assert!(store.add_session(&session));

        let update = SessionUpdate::terminal(SessionStatus::Completed, Utc::now(), 5, 30);
        assert!(store.update_session(&session.id, &update));
        let stored = store.session(&session.id).unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(stored.current_reps, 5);
        assert_eq!(stored.elapsed_seconds, 30);
    }

    #[test]
    fn update_unknown_session_is_noop() {
        let (_kv, store) = memory_store();
        store.add_session(&Session::begin("g1", Utc::now()));
        let before = store.sessions();
        assert!(!store.update_session("missing", &SessionUpdate::default()));
        assert_eq!(store.sessions(), before);
    }

    #[test]
    fn reads_are_copies() {
        let (_kv, store) = memory_store();
        store.add_session(&Session::begin("g1", Utc::now()));
        let mut copy = store.sessions();
        copy[0].current_reps = 99;
        assert_eq!(store.sessions()[0].current_reps, 0);
    }

    #[test]
    fn malformed_collection_reads_as_empty() {
        let (kv, store) = memory_store();
        kv.insert_raw(SESSIONS_KEY, "{not json");
        assert!(store.sessions().is_empty());
        kv.insert_raw(GOALS_KEY, r#"[{"id": 3}]"#);
        assert!(store.goals().is_empty());
    }

    #[test]
    fn failed_write_reports_false_and_keeps_old_state() {
        let (kv, store) = memory_store();
        let first = Session::begin("g1", Utc::now());
        assert!(store.add_session(&first));
        kv.set_reject_writes(true);
        assert!(!store.add_session(&Session::begin("g1", Utc::now())));
        assert_eq!(store.sessions().len(), 1);
    }

    #[test]
    fn failed_read_does_not_overwrite_collection() {
        let (kv, store) = memory_store();
        let first = Session::begin("g1", Utc::now());
        assert!(store.add_session(&first));

        kv.set_fail_reads(true);
        assert!(!store.add_session(&Session::begin("g1", Utc::now())));
        assert!(!store.update_session(&first.id, &SessionUpdate::default()));
        kv.set_fail_reads(false);

        let sessions = store.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, first.id);
    }

    #[test]
    fn stores_sharing_a_file_do_not_lose_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regrow.db");
        let a = Store::new(SqliteKv::open_path(&path).unwrap());
        let b = Store::new(SqliteKv::open_path(&path).unwrap());

        for _ in 0..5 {
            assert!(a.add_session(&Session::begin("g1", Utc::now())));
            assert!(b.add_session(&Session::begin("g2", Utc::now())));
        }
        assert_eq!(a.sessions().len(), 10);
        assert_eq!(b.sessions_by_goal("g1").len(), 5);
    }

    #[test]
    fn delete_goal_cascades_to_sessions() {
        let (_kv, store) = memory_store();
        let keep = GoalDraft::reps("Keep", 3).into_goal(Utc::now());
        let drop = GoalDraft::reps("Drop", 3).into_goal(Utc::now());
        store.add_goal(&keep);
        store.add_goal(&drop);
        store.add_session(&Session::begin(&keep.id, Utc::now()));
        store.add_session(&Session::begin(&drop.id, Utc::now()));
        store.add_session(&Session::begin(&drop.id, Utc::now()));

        assert!(store.delete_goal(&drop.id));
        assert_eq!(store.goals().len(), 1);
        assert_eq!(store.sessions().len(), 1);
        assert!(store.sessions_by_goal(&drop.id).is_empty());
    }

    #[test]
    fn increment_completed_count_stamps_time() {
        let (_kv, store) = memory_store();
        let goal = GoalDraft::timed("Plank", 60).into_goal(Utc::now());
        store.add_goal(&goal);
        let at = Utc::now();
        assert!(store.increment_completed_count(&goal.id, at));
        let stored = store.goal(&goal.id).unwrap();
        assert_eq!(stored.completed_count, 1);
        assert_eq!(stored.last_completed_at, Some(at));
        assert!(!store.increment_completed_count("nope", at));
    }

    #[test]
    fn calendar_flag_defaults_hidden_and_stores_literals() {
        let (kv, store) = memory_store();
        assert!(!store.calendar_visible());
        assert!(store.set_calendar_visible(true));
        assert_eq!(kv.get(CALENDAR_VISIBLE_KEY).unwrap().as_deref(), Some("true"));
        assert!(store.calendar_visible());
        store.set_calendar_visible(false);
        assert_eq!(kv.get(CALENDAR_VISIBLE_KEY).unwrap().as_deref(), Some("false"));
    }
}
