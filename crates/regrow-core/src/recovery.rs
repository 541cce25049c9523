//! Startup recovery for the session store.
//!
//! Runs once per process start, before any attempt begins:
//!
//! 1. Orphan recovery: any session still `active` was left behind by a
//!    process that exited without completing or abandoning it. It is closed
//!    as `abandoned`, keeping the reps and elapsed time last persisted.
//! 2. Retention sweep: when history grows past the high-water mark, only
//!    the most recent sessions (by `startedAt`) down to the low-water mark
//!    are kept.
//!
//! There is no liveness heartbeat: a reload during an attempt abandons it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::session::SessionStatus;
use crate::storage::Store;

/// High-water mark for stored sessions.
pub const MAX_SESSIONS: usize = 5000;
/// Number of sessions kept after a sweep.
pub const PRUNE_TARGET: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_sessions: usize,
    pub prune_target: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_sessions: MAX_SESSIONS,
            prune_target: PRUNE_TARGET,
        }
    }
}

/// Outcome of orphan recovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Sessions examined.
    pub total_sessions: usize,
    /// Ids of sessions moved from active to abandoned.
    pub abandoned: Vec<String>,
    /// False when the store rejected the write.
    pub persisted: bool,
}

/// Outcome of the retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    pub before: usize,
    pub after: usize,
    pub persisted: bool,
}

impl PruneReport {
    pub fn removed(&self) -> usize {
        self.before - self.after
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub recovery: RecoveryReport,
    pub prune: PruneReport,
}

/// Close every session left `active` as `abandoned` at `now`.
pub fn abandon_orphaned_sessions(store: &Store, now: DateTime<Utc>) -> RecoveryReport {
    let mut report = RecoveryReport::default();
    let written = store.modify_sessions(|sessions| {
        report.total_sessions = sessions.len();
        for session in sessions.iter_mut().filter(|s| s.is_active()) {
            session.status = SessionStatus::Abandoned;
            session.completed_at = Some(now);
            report.abandoned.push(session.id.clone());
        }
        !report.abandoned.is_empty()
    });
    if report.abandoned.is_empty() {
        report.persisted = true;
        return report;
    }
    report.persisted = written;
    tracing::info!(
        count = report.abandoned.len(),
        persisted = report.persisted,
        "abandoned orphaned sessions"
    );
    report
}

/// Trim history to `policy.prune_target` once it exceeds `policy.max_sessions`.
pub fn prune_sessions(store: &Store, policy: RetentionPolicy) -> PruneReport {
    let (mut before, mut after) = (0, 0);
    let persisted = store.modify_sessions(|sessions| {
        before = sessions.len();
        after = before;
        if before <= policy.max_sessions {
            return false;
        }
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions.truncate(policy.prune_target);
        after = sessions.len();
        true
    });
    if before <= policy.max_sessions {
        return PruneReport {
            before,
            after: before,
            persisted: true,
        };
    }
    tracing::info!(before, after, persisted, "pruned session history");
    PruneReport {
        before,
        after,
        persisted,
    }
}

/// Orphan recovery followed by the retention sweep.
pub fn startup_sweep(store: &Store, clock: &dyn Clock, policy: RetentionPolicy) -> SweepReport {
    let recovery = abandon_orphaned_sessions(store, clock.now());
    let prune = prune_sessions(store, policy);
    tracing::debug!(
        abandoned = recovery.abandoned.len(),
        pruned = prune.removed(),
        "startup sweep finished"
    );
    SweepReport { recovery, prune }
}
