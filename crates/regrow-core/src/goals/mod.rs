//! Goal records and the observable goal registry.
//!
//! [`GoalRegistry`] is owned by the application shell. Every mutation goes
//! through the store, bumps a version counter and notifies subscribers.
//! [`GoalRegistry::snapshot`] re-reads the store only when the version moved
//! since the last snapshot.

mod goal;

pub use goal::{Goal, GoalDraft, GoalMode, GoalType, GoalUpdate};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::clock::SharedClock;
use crate::error::{Result, ValidationError};
use crate::session::CompletionSink;
use crate::storage::SharedStore;

/// Handle returned by [`GoalRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

struct Cache {
    version: u64,
    goals: Arc<Vec<Goal>>,
}

pub struct GoalRegistry {
    store: SharedStore,
    clock: SharedClock,
    version: Mutex<u64>,
    cache: Mutex<Option<Cache>>,
    listeners: Mutex<Listeners>,
}

impl std::fmt::Debug for GoalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoalRegistry")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

impl GoalRegistry {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            version: Mutex::new(0),
            cache: Mutex::new(None),
            listeners: Mutex::new(Listeners::default()),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.lock().map(|v| *v).unwrap_or(0)
    }

    /// Register a listener called with the new version after each change.
    ///
    /// Listeners run without any registry lock held, so they may subscribe,
    /// unsubscribe or mutate the registry themselves.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        let mut listeners = self.lock_listeners();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, Arc::new(listener));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock_listeners().entries.remove(&id.0).is_some()
    }

    /// Current goal list, shared until the next change.
    pub fn snapshot(&self) -> Arc<Vec<Goal>> {
        let version = self.version();
        let mut cache = match self.cache.lock() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(c) = cache.as_ref() {
            if c.version == version {
                return c.goals.clone();
            }
        }
        let goals = Arc::new(self.store.goals());
        *cache = Some(Cache {
            version,
            goals: goals.clone(),
        });
        goals
    }

    pub fn get(&self, id: &str) -> Option<Goal> {
        self.snapshot().iter().find(|g| g.id == id).cloned()
    }

    /// Validate and store a new goal.
    pub fn add_goal(&self, draft: GoalDraft) -> Result<Goal> {
        draft.validate()?;
        let goal = draft.into_goal(self.clock.now());
        if !self.store.add_goal(&goal) {
            tracing::warn!(goal_id = %goal.id, "goal not persisted");
        }
        self.notify();
        Ok(goal)
    }

    pub fn update_goal(&self, id: &str, update: &GoalUpdate) -> Result<()> {
        let mut goal = self.store.goal(id).ok_or_else(|| ValidationError::NotFound {
            kind: "goal".into(),
            id: id.to_string(),
        })?;
        update.apply(&mut goal);
        goal.validate()?;
        self.store.update_goal(id, update);
        self.notify();
        Ok(())
    }

    /// Delete a goal and its sessions.
    pub fn delete_goal(&self, id: &str) -> bool {
        let deleted = self.store.delete_goal(id);
        self.notify();
        deleted
    }

    pub fn increment_completed(&self, goal_id: &str, at: DateTime<Utc>) -> bool {
        let updated = self.store.increment_completed_count(goal_id, at);
        self.notify();
        updated
    }

    /// Force the next snapshot to re-read the store.
    pub fn reload(&self) {
        self.notify();
    }

    fn notify(&self) {
        let version = {
            let mut v = match self.version.lock() {
                Ok(v) => v,
                Err(poisoned) => poisoned.into_inner(),
            };
            *v += 1;
            *v
        };
        let listeners: Vec<Listener> = self.lock_listeners().entries.values().cloned().collect();
        for listener in listeners {
            listener(version);
        }
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Listeners> {
        match self.listeners.lock() {
            Ok(l) => l,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CompletionSink for GoalRegistry {
    fn goal_completed(&self, goal_id: &str, at: DateTime<Utc>) {
        self.increment_completed(goal_id, at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::Store;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::OnceLock;

    fn registry() -> GoalRegistry {
        let clock = ManualClock::at_epoch_2025();
        GoalRegistry::new(Store::in_memory().shared(), clock.shared())
    }

    #[test]
    fn snapshot_is_cached_until_change() {
        let reg = registry();
        let first = reg.snapshot();
        assert!(Arc::ptr_eq(&first, &reg.snapshot()));

        reg.add_goal(GoalDraft::reps("Push-ups", 20)).unwrap();
        let second = reg.snapshot();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn listeners_receive_versions_until_unsubscribed() {
        let reg = registry();
        let seen = Arc::new(AtomicU64::new(0));
        let s = seen.clone();
        let id = reg.subscribe(move |v| s.store(v, Ordering::SeqCst));

        reg.add_goal(GoalDraft::timed("Plank", 60)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        reg.reload();
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        assert!(reg.unsubscribe(id));
        reg.reload();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(!reg.unsubscribe(id));
    }

    #[test]
    fn listener_can_unsubscribe_itself() {
        let reg = Arc::new(registry());
        let calls = Arc::new(AtomicUsize::new(0));
        let own_id: Arc<OnceLock<SubscriptionId>> = Arc::new(OnceLock::new());

        let weak = Arc::downgrade(&reg);
        let (c, own) = (calls.clone(), own_id.clone());
        let id = reg.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            if let (Some(reg), Some(id)) = (weak.upgrade(), own.get()) {
                reg.unsubscribe(*id);
            }
        });
        own_id.set(id).unwrap();

        reg.reload();
        reg.reload();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!reg.unsubscribe(id));
    }

    #[test]
    fn listener_can_mutate_registry() {
        let reg = Arc::new(registry());
        let nested = Arc::new(AtomicU64::new(0));
        let weak = Arc::downgrade(&reg);
        let n = nested.clone();
        reg.subscribe(move |version| {
            let Some(reg) = weak.upgrade() else { return };
            if version == 1 {
                let n = n.clone();
                reg.subscribe(move |v| n.store(v, Ordering::SeqCst));
                reg.reload();
            }
        });

        reg.add_goal(GoalDraft::reps("Squats", 10)).unwrap();
        assert_eq!(reg.version(), 2);
        assert_eq!(nested.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn add_goal_rejects_invalid_draft() {
        let reg = registry();
        assert!(reg.add_goal(GoalDraft::reps("Bad", 0)).is_err());
        assert_eq!(reg.version(), 0);
    }

    #[test]
    fn update_goal_validates_merged_result() {
        let reg = registry();
        let goal = reg.add_goal(GoalDraft::reps("Squats", 10)).unwrap();
        let bad = GoalUpdate {
            target_reps: Some(None),
            ..Default::default()
        };
        assert!(reg.update_goal(&goal.id, &bad).is_err());

        let rename = GoalUpdate {
            name: Some("Deep squats".into()),
            ..Default::default()
        };
        reg.update_goal(&goal.id, &rename).unwrap();
        assert_eq!(reg.get(&goal.id).unwrap().name, "Deep squats");
        assert!(reg.update_goal("missing", &rename).is_err());
    }

    #[test]
    fn completion_sink_bumps_count() {
        let reg = registry();
        let goal = reg.add_goal(GoalDraft::reps("Squats", 10)).unwrap();
        let at = Utc::now();
        reg.goal_completed(&goal.id, at);
        reg.goal_completed(&goal.id, at);
        let stored = reg.get(&goal.id).unwrap();
        assert_eq!(stored.completed_count, 2);
        assert_eq!(stored.last_completed_at, Some(at));
    }
}
