//! Session persistence lifecycle.
//!
//! [`SessionManager`] owns the three store operations on sessions: start,
//! complete, abandon. A terminal update is applied only to a session that is
//! still `active` in the store, so repeating it cannot change a closed
//! record.

use chrono::{DateTime, Utc};

use super::record::{Session, SessionStatus, SessionUpdate};
use crate::clock::SharedClock;
use crate::storage::SharedStore;

/// Notified once per completed session so the goal owner can bump
/// `completedCount` and `lastCompletedAt`.
pub trait CompletionSink: Send + Sync {
    fn goal_completed(&self, goal_id: &str, at: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl CompletionSink for NoopSink {
    fn goal_completed(&self, _goal_id: &str, _at: DateTime<Utc>) {}
}

#[derive(Clone)]
pub struct SessionManager {
    store: SharedStore,
    clock: SharedClock,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Create and persist a new active session.
    ///
    /// The session is returned even if the store rejected the write.
    pub fn start_session(&self, goal_id: &str) -> Session {
        let session = Session::begin(goal_id, self.clock.now());
        if self.store.add_session(&session) {
            tracing::info!(session_id = %session.id, goal_id, "session started");
        } else {
            tracing::warn!(session_id = %session.id, goal_id, "session started but not persisted");
        }
        session
    }

    pub fn complete_session(&self, id: &str, reps: u32, elapsed_seconds: u64) -> bool {
        self.close(id, SessionStatus::Completed, reps, elapsed_seconds)
    }

    pub fn abandon_session(&self, id: &str, reps: u32, elapsed_seconds: u64) -> bool {
        self.close(id, SessionStatus::Abandoned, reps, elapsed_seconds)
    }

    fn close(&self, id: &str, status: SessionStatus, reps: u32, elapsed_seconds: u64) -> bool {
        match self.store.session(id) {
            None => {
                tracing::debug!(session_id = id, %status, "close for unknown session ignored");
                false
            }
            Some(existing) if existing.status.is_terminal() => {
                tracing::debug!(
                    session_id = id,
                    current = %existing.status,
                    requested = %status,
                    "session already closed"
                );
                false
            }
            Some(_) => {
                let update = SessionUpdate::terminal(status, self.clock.now(), reps, elapsed_seconds);
                let persisted = self.store.update_session(id, &update);
                if persisted {
                    tracing::info!(session_id = id, %status, reps, elapsed_seconds, "session closed");
                } else {
                    tracing::warn!(session_id = id, %status, "session close not persisted");
                }
                persisted
            }
        }
    }
}
