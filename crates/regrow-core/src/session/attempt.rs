//! One user attempt at a goal.
//!
//! An [`Attempt`] owns the session record for the interaction plus the timer
//! subsystems the goal asks for:
//!
//! | goal                 | countdown | stopwatch            | auto-count |
//! |----------------------|-----------|----------------------|------------|
//! | reps                 | -         | when `showStopwatch` | -          |
//! | reps + auto-count    | -         | -                    | yes        |
//! | time                 | yes       | -                    | -          |
//!
//! Like the timers it drives, an attempt has no thread of its own; the shell
//! calls [`Attempt::tick`] on its tick period. Every command returns the
//! events it produced.
//!
//! The terminal transition is a check-and-set on `outcome`, done before the
//! store is touched. Whichever of "rep target reached", "countdown finished",
//! "finish early" or "abandon" gets there first wins; the others become
//! no-ops, and so does any tick that arrives afterwards.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::manager::{CompletionSink, SessionManager};
use super::record::{Session, SessionStatus};
use crate::events::{Event, RepSource};
use crate::feedback::{SharedFeedback, DEFAULT_PULSE_MS};
use crate::goals::{Goal, GoalMode};
use crate::storage::Config;
use crate::timer::{AutoCounter, CountdownTimer, Stopwatch, DEFAULT_TICK_MS};

/// Tunables for the subsystems of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOptions {
    pub tick_ms: u64,
    pub stopwatch_period_ms: u64,
    pub pulse_ms: u64,
}

impl Default for AttemptOptions {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            stopwatch_period_ms: 1000,
            pulse_ms: DEFAULT_PULSE_MS,
        }
    }
}

impl From<&Config> for AttemptOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            tick_ms: cfg.timer.tick_ms,
            stopwatch_period_ms: cfg.timer.stopwatch_period_ms,
            pulse_ms: cfg.feedback.pulse_ms,
        }
    }
}

/// Frozen result of a terminal transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session_id: String,
    pub status: SessionStatus,
    pub reps: u32,
    pub elapsed_seconds: u64,
    pub at: DateTime<Utc>,
    /// False when the store did not accept the terminal write.
    pub persisted: bool,
}

pub struct Attempt {
    goal: Goal,
    mode: GoalMode,
    manager: SessionManager,
    sink: Arc<dyn CompletionSink>,
    feedback: SharedFeedback,
    options: AttemptOptions,
    session: Session,
    /// Wall-clock ms the current session started; elapsed time derives from it.
    started_ms: u64,
    reps: u32,
    outcome: Option<SessionOutcome>,
    countdown: Option<CountdownTimer>,
    stopwatch: Option<Stopwatch>,
    auto_count: Option<AutoCounter>,
}

impl std::fmt::Debug for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attempt")
            .field("goal_id", &self.goal.id)
            .field("session_id", &self.session.id)
            .field("reps", &self.reps)
            .field("outcome", &self.outcome)
            .field("countdown", &self.countdown)
            .field("stopwatch", &self.stopwatch)
            .field("auto_count", &self.auto_count)
            .finish()
    }
}

impl Attempt {
    /// Start a session against `goal` and build its subsystems.
    ///
    /// Returns the attempt together with its `SessionStarted` event.
    pub fn begin(
        goal: Goal,
        manager: SessionManager,
        sink: Arc<dyn CompletionSink>,
        feedback: SharedFeedback,
        options: AttemptOptions,
    ) -> (Self, Event) {
        let clock = manager.clock().clone();
        let mode = goal.mode();

        let countdown = match mode {
            GoalMode::Timed { seconds } => Some(CountdownTimer::with_tick_ms(
                clock.clone(),
                u64::from(seconds),
                options.tick_ms,
            )),
            _ => None,
        };
        let stopwatch = match mode {
            GoalMode::ManualReps {
                stopwatch: true, ..
            } => {
                let mut sw = Stopwatch::with_period_ms(clock.clone(), options.stopwatch_period_ms);
                sw.mount();
                Some(sw)
            }
            _ => None,
        };
        let auto_count = match mode {
            GoalMode::AutoCount { interval_secs, .. } => Some(
                AutoCounter::new(clock.clone(), feedback.clone(), u64::from(interval_secs))
                    .with_pulse_ms(options.pulse_ms),
            ),
            _ => None,
        };

        let started_ms = clock.now_ms();
        let session = manager.start_session(&goal.id);
        let event = Event::SessionStarted {
            session_id: session.id.clone(),
            goal_id: goal.id.clone(),
            at: session.started_at,
        };
        let attempt = Self {
            goal,
            mode,
            manager,
            sink,
            feedback,
            options,
            session,
            started_ms,
            reps: 0,
            outcome: None,
            countdown,
            stopwatch,
            auto_count,
        };
        (attempt, event)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn mode(&self) -> GoalMode {
        self.mode
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_id(&self) -> &str {
        &self.session.id
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn countdown(&self) -> Option<&CountdownTimer> {
        self.countdown.as_ref()
    }

    pub fn stopwatch(&self) -> Option<&Stopwatch> {
        self.stopwatch.as_ref()
    }

    pub fn auto_counter(&self) -> Option<&AutoCounter> {
        self.auto_count.as_ref()
    }

    /// Whole seconds since the current session started.
    pub fn elapsed_seconds(&self) -> u64 {
        self.manager.clock().now_ms().saturating_sub(self.started_ms) / 1000
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            session_id: self.session.id.clone(),
            goal_id: self.goal.id.clone(),
            status: self
                .outcome
                .as_ref()
                .map(|o| o.status)
                .unwrap_or(SessionStatus::Active),
            reps: self.reps,
            target_reps: self.goal.rep_target(),
            remaining_seconds: self.countdown.as_ref().map(|t| t.remaining_seconds()),
            timer_running: self.countdown.as_ref().is_some_and(|t| t.is_running()),
            stopwatch_seconds: self.stopwatch.as_ref().map(|s| s.seconds()),
            auto_count_running: self.auto_count.as_ref().is_some_and(|a| a.is_running()),
            auto_count_countdown: self
                .auto_count
                .as_ref()
                .filter(|a| a.is_running())
                .map(|a| a.countdown()),
            at: self.manager.clock().now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Add one rep by hand.
    pub fn increment(&mut self) -> Vec<Event> {
        self.add_rep(RepSource::Manual)
    }

    pub fn start_timer(&mut self) -> Vec<Event> {
        if self.is_terminal() {
            return Vec::new();
        }
        let Some(timer) = self.countdown.as_mut() else {
            return Vec::new();
        };
        let event = timer.start();
        if event.is_some() {
            self.feedback.pulse(self.options.pulse_ms);
        }
        event.into_iter().collect()
    }

    pub fn pause_timer(&mut self) -> Vec<Event> {
        if self.is_terminal() {
            return Vec::new();
        }
        let Some(event) = self.countdown.as_mut().and_then(|t| t.pause()) else {
            return Vec::new();
        };
        self.feedback.pulse(self.options.pulse_ms);
        self.after_timer_event(event)
    }

    pub fn toggle_timer(&mut self) -> Vec<Event> {
        match self.countdown.as_ref() {
            Some(t) if t.is_running() => self.pause_timer(),
            Some(_) => self.start_timer(),
            None => Vec::new(),
        }
    }

    pub fn start_auto_count(&mut self) -> Vec<Event> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.auto_count
            .as_mut()
            .and_then(|a| a.start())
            .into_iter()
            .collect()
    }

    pub fn stop_auto_count(&mut self) -> Vec<Event> {
        self.auto_count
            .as_mut()
            .and_then(|a| a.stop())
            .into_iter()
            .collect()
    }

    pub fn toggle_auto_count(&mut self) -> Vec<Event> {
        match self.auto_count.as_ref() {
            Some(a) if a.is_running() => self.stop_auto_count(),
            Some(_) => self.start_auto_count(),
            None => Vec::new(),
        }
    }

    /// Complete now with the reps counted so far.
    pub fn finish_early(&mut self) -> Vec<Event> {
        self.complete()
    }

    /// Leave without finishing.
    pub fn abandon(&mut self) -> Vec<Event> {
        let Some(outcome) = self.close(SessionStatus::Abandoned) else {
            return Vec::new();
        };
        vec![Event::SessionAbandoned {
            session_id: outcome.session_id,
            goal_id: self.goal.id.clone(),
            reps: outcome.reps,
            elapsed_seconds: outcome.elapsed_seconds,
            at: outcome.at,
        }]
    }

    /// Start a brand-new session against the same goal after a terminal
    /// transition. Does nothing while the current session is active.
    pub fn repeat(&mut self) -> Vec<Event> {
        if !self.is_terminal() {
            return Vec::new();
        }
        if let Some(timer) = self.countdown.as_mut() {
            timer.reset();
        }
        if let Some(sw) = self.stopwatch.as_mut() {
            sw.clear();
            sw.mount();
        }
        if let Some(ac) = self.auto_count.as_mut() {
            ac.stop();
            ac.reset_countdown();
        }
        self.reps = 0;
        self.outcome = None;
        self.started_ms = self.manager.clock().now_ms();
        self.session = self.manager.start_session(&self.goal.id);
        vec![Event::SessionStarted {
            session_id: self.session.id.clone(),
            goal_id: self.goal.id.clone(),
            at: self.session.started_at,
        }]
    }

    /// Poll countdown, stopwatch and auto-count, in that order.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.is_terminal() {
            return Vec::new();
        }
        let mut events = Vec::new();

        if let Some(event) = self.countdown.as_mut().and_then(|t| t.tick()) {
            events.extend(self.after_timer_event(event));
            if self.is_terminal() {
                return events;
            }
        }

        if let Some(event) = self.stopwatch.as_mut().and_then(|s| s.tick()) {
            events.push(event);
        }

        if let Some(event) = self.auto_count.as_mut().and_then(|a| a.tick()) {
            let fired = matches!(event, Event::AutoCountFired { .. });
            events.push(event);
            if fired {
                events.extend(self.add_rep(RepSource::AutoCount));
            }
        }

        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn add_rep(&mut self, source: RepSource) -> Vec<Event> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.reps += 1;
        let previous_interval_secs = self.stopwatch.as_mut().and_then(|sw| {
            sw.reset();
            sw.previous()
        });
        self.feedback.pulse(self.options.pulse_ms);
        tracing::debug!(session_id = %self.session.id, reps = self.reps, ?source, "rep counted");

        let mut events = vec![Event::RepCounted {
            session_id: self.session.id.clone(),
            reps: self.reps,
            source,
            previous_interval_secs,
            at: self.manager.clock().now(),
        }];
        if let Some(target) = self.goal.rep_target() {
            if self.reps >= target {
                events.extend(self.complete());
            }
        }
        events
    }

    fn after_timer_event(&mut self, event: Event) -> Vec<Event> {
        let finished = matches!(event, Event::TimerFinished { .. });
        let mut events = vec![event];
        if finished {
            events.extend(self.complete());
        }
        events
    }

    fn complete(&mut self) -> Vec<Event> {
        let Some(outcome) = self.close(SessionStatus::Completed) else {
            return Vec::new();
        };
        self.sink.goal_completed(&self.goal.id, outcome.at);
        vec![Event::SessionCompleted {
            session_id: outcome.session_id,
            goal_id: self.goal.id.clone(),
            reps: outcome.reps,
            elapsed_seconds: outcome.elapsed_seconds,
            at: outcome.at,
        }]
    }

    /// The single terminal transition. Returns `None` if one already happened.
    fn close(&mut self, status: SessionStatus) -> Option<SessionOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        let elapsed_seconds = self.elapsed_seconds();
        let at = self.manager.clock().now();
        self.outcome = Some(SessionOutcome {
            session_id: self.session.id.clone(),
            status,
            reps: self.reps,
            elapsed_seconds,
            at,
            persisted: false,
        });
        self.halt();

        let persisted = match status {
            SessionStatus::Completed => {
                self.manager
                    .complete_session(&self.session.id, self.reps, elapsed_seconds)
            }
            SessionStatus::Abandoned => {
                self.manager
                    .abandon_session(&self.session.id, self.reps, elapsed_seconds)
            }
            SessionStatus::Active => false,
        };

        self.session.status = status;
        self.session.completed_at = Some(at);
        self.session.current_reps = self.reps;
        self.session.elapsed_seconds = elapsed_seconds;

        let outcome = self.outcome.as_mut()?;
        outcome.persisted = persisted;
        Some(outcome.clone())
    }

    /// Cancel every periodic trigger.
    fn halt(&mut self) {
        if let Some(timer) = self.countdown.as_mut() {
            timer.halt();
        }
        if let Some(sw) = self.stopwatch.as_mut() {
            sw.unmount();
        }
        if let Some(ac) = self.auto_count.as_mut() {
            ac.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::feedback::silent;
    use crate::goals::GoalDraft;
    use crate::session::NoopSink;
    use crate::storage::Store;

    fn attempt(draft: GoalDraft) -> (ManualClock, Attempt) {
        let clock = ManualClock::at_epoch_2025();
        let manager = SessionManager::new(Store::in_memory().shared(), clock.shared());
        let goal = draft.into_goal(clock.now());
        let (attempt, _) = Attempt::begin(
            goal,
            manager,
            Arc::new(NoopSink),
            silent(),
            AttemptOptions::default(),
        );
        (clock, attempt)
    }

    #[test]
    fn subsystems_follow_goal_mode() {
        let (_c, manual) = attempt(GoalDraft::reps("Squats", 5));
        assert!(manual.stopwatch().is_some_and(|s| s.is_mounted()));
        assert!(manual.countdown().is_none());
        assert!(manual.auto_counter().is_none());

        let mut hidden = GoalDraft::reps("Squats", 5);
        hidden.show_stopwatch = false;
        let (_c, hidden) = attempt(hidden);
        assert!(hidden.stopwatch().is_none());

        let (_c, auto) = attempt(GoalDraft::reps("Squats", 5).with_auto_count(3));
        assert!(auto.stopwatch().is_none());
        assert!(auto.auto_counter().is_some());

        let (_c, timed) = attempt(GoalDraft::timed("Plank", 30));
        assert!(timed.countdown().is_some());
        assert!(timed.stopwatch().is_none());
    }

    #[test]
    fn increment_reports_previous_rep_pace() {
        let (clock, mut a) = attempt(GoalDraft::reps("Squats", 5));
        for _ in 0..4 {
            clock.advance_secs(1);
            a.tick();
        }
        let events = a.increment();
        assert!(matches!(
            events.as_slice(),
            [Event::RepCounted {
                reps: 1,
                previous_interval_secs: Some(4),
                ..
            }]
        ));
    }

    #[test]
    fn timer_commands_are_noops_without_countdown() {
        let (_c, mut a) = attempt(GoalDraft::reps("Squats", 5));
        assert!(a.start_timer().is_empty());
        assert!(a.toggle_timer().is_empty());
        assert!(a.toggle_auto_count().is_empty());
    }

    #[test]
    fn repeat_requires_terminal_session() {
        let (_c, mut a) = attempt(GoalDraft::reps("Squats", 5));
        let first = a.session_id().to_string();
        assert!(a.repeat().is_empty());
        assert_eq!(a.session_id(), first);
    }

    #[test]
    fn finish_early_past_target_does_not_finish_countdown() {
        let (clock, mut a) = attempt(GoalDraft::timed("Plank", 5));
        a.start_timer();
        clock.advance_secs(8);

        let events = a.finish_early();
        assert!(matches!(events.as_slice(), [Event::SessionCompleted { .. }]));
        let timer = a.countdown().unwrap();
        assert!(!timer.is_finished());
        assert!(!timer.is_running());
        assert!(!timer.is_armed());
        assert!(a.tick().is_empty());
    }

    #[test]
    fn snapshot_reflects_state() {
        let (_c, mut a) = attempt(GoalDraft::timed("Plank", 30));
        a.start_timer();
        match a.snapshot() {
            Event::StateSnapshot {
                status,
                remaining_seconds,
                timer_running,
                stopwatch_seconds,
                ..
            } => {
                assert_eq!(status, SessionStatus::Active);
                assert_eq!(remaining_seconds, Some(30));
                assert!(timer_running);
                assert_eq!(stopwatch_seconds, None);
            }
            other => panic!("expected StateSnapshot, got {other:?}"),
        }
    }
}
