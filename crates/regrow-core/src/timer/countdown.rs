//! Countdown timer implementation.
//!
//! The countdown is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()`
//! periodically (every 200ms by default).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Finished
//!   ^________________________________|  (reset)
//! ```
//!
//! Remaining time is always recomputed from the anchor timestamp plus the
//! running time carried over from earlier pauses, never by decrementing per
//! tick, so a late or skipped tick cannot make the timer drift.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::cadence::Cadence;
use crate::clock::SharedClock;
use crate::events::Event;

/// Default tick period for the countdown.
pub const DEFAULT_TICK_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownState {
    Idle,
    Running,
    Paused,
    /// Terminal until `reset()`.
    Finished,
}

type FinishHandler = Box<dyn FnMut() + Send>;

pub struct CountdownTimer {
    clock: SharedClock,
    total_seconds: u64,
    remaining_seconds: u64,
    state: CountdownState,
    /// Wall-clock ms when the timer was last started or resumed.
    anchor_ms: Option<u64>,
    /// Running time accumulated before the current anchor, in seconds.
    carried_secs: f64,
    cadence: Cadence,
    on_finish: Option<FinishHandler>,
}

impl fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("total_seconds", &self.total_seconds)
            .field("remaining_seconds", &self.remaining_seconds)
            .field("state", &self.state)
            .field("anchor_ms", &self.anchor_ms)
            .field("carried_secs", &self.carried_secs)
            .field("cadence", &self.cadence)
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

impl CountdownTimer {
    pub fn new(clock: SharedClock, total_seconds: u64) -> Self {
        Self::with_tick_ms(clock, total_seconds, DEFAULT_TICK_MS)
    }

    pub fn with_tick_ms(clock: SharedClock, total_seconds: u64, tick_ms: u64) -> Self {
        Self {
            clock,
            total_seconds,
            remaining_seconds: total_seconds,
            state: CountdownState::Idle,
            anchor_ms: None,
            carried_secs: 0.0,
            cadence: Cadence::new(tick_ms),
            on_finish: None,
        }
    }

    /// Replace the handler invoked once when the countdown reaches zero.
    pub fn set_on_finish<F>(&mut self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_finish = Some(Box::new(handler));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    pub fn is_finished(&self) -> bool {
        self.state == CountdownState::Finished
    }

    pub fn has_started(&self) -> bool {
        self.state != CountdownState::Idle
    }

    /// True while a tick is scheduled.
    pub fn is_armed(&self) -> bool {
        self.cadence.is_armed()
    }

    /// 0.0 .. 1.0 progress towards zero.
    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        let done = self.total_seconds - self.remaining_seconds;
        (done as f64 / self.total_seconds as f64).min(1.0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        match self.state {
            CountdownState::Idle | CountdownState::Paused => {
                let resumed = self.state == CountdownState::Paused;
                let now = self.clock.now_ms();
                self.anchor_ms = Some(now);
                self.state = CountdownState::Running;
                self.cadence.arm(now);
                tracing::debug!(
                    remaining = self.remaining_seconds,
                    resumed,
                    "countdown running"
                );
                let at = self.clock.now();
                if resumed {
                    Some(Event::TimerResumed {
                        remaining_seconds: self.remaining_seconds,
                        at,
                    })
                } else {
                    Some(Event::TimerStarted {
                        total_seconds: self.total_seconds,
                        remaining_seconds: self.remaining_seconds,
                        at,
                    })
                }
            }
            CountdownState::Running | CountdownState::Finished => None,
        }
    }

    /// Pause a running countdown.
    ///
    /// Returns `TimerFinished` instead of `TimerPaused` when the target was
    /// already reached before this call.
    pub fn pause(&mut self) -> Option<Event> {
        if self.state != CountdownState::Running {
            return None;
        }
        let now = self.clock.now_ms();
        self.cadence.cancel();
        if let Some(anchor) = self.anchor_ms.take() {
            self.carried_secs += now.saturating_sub(anchor) as f64 / 1000.0;
        }
        self.remaining_seconds = self.compute_remaining(None);
        if self.remaining_seconds == 0 {
            return Some(self.finish());
        }
        self.state = CountdownState::Paused;
        Some(Event::TimerPaused {
            remaining_seconds: self.remaining_seconds,
            at: self.clock.now(),
        })
    }

    /// Stop without finishing.
    ///
    /// Running time is folded into the carried elapsed and the timer is left
    /// paused. The finish handler never runs, even past the target.
    pub fn halt(&mut self) {
        if self.state != CountdownState::Running {
            return;
        }
        let now = self.clock.now_ms();
        self.cadence.cancel();
        if let Some(anchor) = self.anchor_ms.take() {
            self.carried_secs += now.saturating_sub(anchor) as f64 / 1000.0;
        }
        self.remaining_seconds = self.compute_remaining(None);
        self.state = CountdownState::Paused;
        tracing::debug!(remaining = self.remaining_seconds, "countdown halted");
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.cadence.cancel();
        self.remaining_seconds = self.total_seconds;
        self.state = CountdownState::Idle;
        self.anchor_ms = None;
        self.carried_secs = 0.0;
        Some(Event::TimerReset {
            at: self.clock.now(),
        })
    }

    /// Call periodically. Acts only when the tick cadence is due.
    ///
    /// Returns `TimerTick` when the displayed value changed and
    /// `TimerFinished` when the countdown reached zero.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state != CountdownState::Running {
            return None;
        }
        let now = self.clock.now_ms();
        if !self.cadence.fire_if_due(now) {
            return None;
        }
        self.recompute(now)
    }

    /// Recompute remaining time now, regardless of the tick cadence.
    pub fn refresh(&mut self) -> Option<Event> {
        if self.state != CountdownState::Running {
            return None;
        }
        let now = self.clock.now_ms();
        self.recompute(now)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn recompute(&mut self, now_ms: u64) -> Option<Event> {
        let previous = self.remaining_seconds;
        self.remaining_seconds = self.compute_remaining(Some(now_ms));
        if self.remaining_seconds == 0 {
            return Some(self.finish());
        }
        if self.remaining_seconds != previous {
            return Some(Event::TimerTick {
                remaining_seconds: self.remaining_seconds,
                at: self.clock.now(),
            });
        }
        None
    }

    fn compute_remaining(&self, now_ms: Option<u64>) -> u64 {
        let running = match (self.anchor_ms, now_ms) {
            (Some(anchor), Some(now)) => now.saturating_sub(anchor) as f64 / 1000.0,
            _ => 0.0,
        };
        let elapsed = (running + self.carried_secs).floor() as u64;
        self.total_seconds.saturating_sub(elapsed)
    }

    fn finish(&mut self) -> Event {
        self.cadence.cancel();
        self.anchor_ms = None;
        self.remaining_seconds = 0;
        self.state = CountdownState::Finished;
        tracing::debug!(total = self.total_seconds, "countdown finished");
        if let Some(handler) = self.on_finish.as_mut() {
            handler();
        }
        Event::TimerFinished {
            total_seconds: self.total_seconds,
            at: self.clock.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn timer(total: u64) -> (ManualClock, CountdownTimer) {
        let clock = ManualClock::at_epoch_2025();
        let timer = CountdownTimer::new(clock.shared(), total);
        (clock, timer)
    }

    #[test]
    fn start_pause_resume() {
        let (_clock, mut t) = timer(60);
        assert_eq!(t.state(), CountdownState::Idle);

        assert!(matches!(t.start(), Some(Event::TimerStarted { .. })));
        assert_eq!(t.state(), CountdownState::Running);
        assert!(t.start().is_none());

        assert!(matches!(t.pause(), Some(Event::TimerPaused { .. })));
        assert_eq!(t.state(), CountdownState::Paused);
        assert!(!t.is_armed());
        assert!(t.pause().is_none());

        assert!(matches!(t.start(), Some(Event::TimerResumed { .. })));
        assert_eq!(t.state(), CountdownState::Running);
    }

    #[test]
    fn tick_waits_for_cadence() {
        let (clock, mut t) = timer(60);
        t.start();
        clock.advance_ms(100);
        assert!(t.tick().is_none());
        clock.advance_ms(1_000);
        match t.tick() {
            Some(Event::TimerTick {
                remaining_seconds, ..
            }) => assert_eq!(remaining_seconds, 59),
            other => panic!("expected TimerTick, got {other:?}"),
        }
    }

    #[test]
    fn finishes_after_clock_jump_without_intermediate_ticks() {
        let (clock, mut t) = timer(5);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        t.set_on_finish(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        t.start();
        clock.advance_secs(5);
        assert!(matches!(t.tick(), Some(Event::TimerFinished { .. })));
        assert!(t.is_finished());
        assert!(!t.is_running());
        assert_eq!(t.remaining_seconds(), 0);

        clock.advance_secs(5);
        assert!(t.tick().is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn paused_time_does_not_count() {
        let (clock, mut t) = timer(60);
        t.start();
        clock.advance_ms(12_500);
        t.pause();
        assert_eq!(t.remaining_seconds(), 48);

        clock.advance_secs(600);
        t.start();
        t.refresh();
        assert_eq!(t.remaining_seconds(), 48);

        // Fractional carry: 12.5s + 0.5s = 13s.
        clock.advance_ms(500);
        t.refresh();
        assert_eq!(t.remaining_seconds(), 47);
    }

    #[test]
    fn start_is_noop_once_finished() {
        let (clock, mut t) = timer(1);
        t.start();
        clock.advance_secs(2);
        t.tick();
        assert!(t.start().is_none());
        assert!(t.is_finished());
    }

    #[test]
    fn reset_restores_full_duration_and_allows_new_run() {
        let (clock, mut t) = timer(3);
        t.start();
        clock.advance_secs(3);
        t.tick();
        assert!(t.is_finished());

        t.reset();
        assert_eq!(t.state(), CountdownState::Idle);
        assert_eq!(t.remaining_seconds(), 3);
        assert!(!t.is_armed());

        t.start();
        clock.advance_secs(1);
        t.refresh();
        assert_eq!(t.remaining_seconds(), 2);
    }

    #[test]
    fn pause_past_target_finishes() {
        let (clock, mut t) = timer(2);
        t.start();
        clock.advance_secs(3);
        assert!(matches!(t.pause(), Some(Event::TimerFinished { .. })));
        assert!(t.is_finished());
    }

    #[test]
    fn halt_past_target_does_not_finish() {
        let (clock, mut t) = timer(2);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        t.set_on_finish(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        t.start();
        clock.advance_secs(3);
        t.halt();
        assert_eq!(t.state(), CountdownState::Paused);
        assert_eq!(t.remaining_seconds(), 0);
        assert!(!t.is_armed());
        assert!(t.tick().is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn progress_tracks_elapsed_fraction() {
        let (clock, mut t) = timer(10);
        assert_eq!(t.progress(), 0.0);
        t.start();
        clock.advance_secs(5);
        t.refresh();
        assert!((t.progress() - 0.5).abs() < f64::EPSILON);
    }
}
