//! Auto-count ticker.
//!
//! Adds a rep every `interval` seconds and shows a per-second countdown to
//! the next one. Two cadences share one `running` flag: the display cadence
//! (1s) and the increment cadence (`interval`s). Stopping disarms both.

use std::fmt;

use super::cadence::Cadence;
use crate::clock::SharedClock;
use crate::events::Event;
use crate::feedback::{SharedFeedback, DEFAULT_PULSE_MS};

const DISPLAY_MS: u64 = 1000;

type IncrementHandler = Box<dyn FnMut() + Send>;

pub struct AutoCounter {
    clock: SharedClock,
    feedback: SharedFeedback,
    pulse_ms: u64,
    interval_secs: u64,
    countdown: u64,
    running: bool,
    display: Cadence,
    increment: Cadence,
    on_increment: Option<IncrementHandler>,
}

impl fmt::Debug for AutoCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoCounter")
            .field("interval_secs", &self.interval_secs)
            .field("countdown", &self.countdown)
            .field("running", &self.running)
            .field("on_increment", &self.on_increment.is_some())
            .finish()
    }
}

impl AutoCounter {
    /// `interval_secs` is clamped to at least one second.
    pub fn new(clock: SharedClock, feedback: SharedFeedback, interval_secs: u64) -> Self {
        let interval_secs = interval_secs.max(1);
        Self {
            clock,
            feedback,
            pulse_ms: DEFAULT_PULSE_MS,
            interval_secs,
            countdown: interval_secs,
            running: false,
            display: Cadence::new(DISPLAY_MS),
            increment: Cadence::new(interval_secs * 1000),
            on_increment: None,
        }
    }

    pub fn with_pulse_ms(mut self, pulse_ms: u64) -> Self {
        self.pulse_ms = pulse_ms;
        self
    }

    pub fn set_on_increment<F>(&mut self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_increment = Some(Box::new(handler));
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Seconds until the next automatic rep, as displayed.
    pub fn countdown(&self) -> u64 {
        self.countdown
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn start(&mut self) -> Option<Event> {
        self.countdown = self.interval_secs;
        self.running = true;
        self.rebuild();
        self.feedback.pulse(self.pulse_ms);
        tracing::debug!(interval = self.interval_secs, "auto-count started");
        Some(Event::AutoCountStarted {
            interval_secs: self.interval_secs,
            at: self.clock.now(),
        })
    }

    /// Idempotent: returns `None` when already stopped.
    pub fn stop(&mut self) -> Option<Event> {
        self.display.cancel();
        self.increment.cancel();
        if !self.running {
            return None;
        }
        self.running = false;
        tracing::debug!("auto-count stopped");
        Some(Event::AutoCountStopped {
            at: self.clock.now(),
        })
    }

    pub fn reset_countdown(&mut self) {
        self.countdown = self.interval_secs;
    }

    /// Takes effect from the next boundary; both cadences are rebuilt.
    pub fn set_interval(&mut self, interval_secs: u64) {
        let interval_secs = interval_secs.max(1);
        if interval_secs == self.interval_secs {
            return;
        }
        self.interval_secs = interval_secs;
        self.increment = Cadence::new(interval_secs * 1000);
        if self.running {
            self.countdown = interval_secs;
            self.rebuild();
        } else {
            self.countdown = self.countdown.min(interval_secs);
        }
    }

    /// Poll both cadences. An increment firing wins over the display tick.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        let now = self.clock.now_ms();
        let display_due = self.display.fire_if_due(now);
        if display_due {
            self.countdown = self.countdown.saturating_sub(1);
        }
        if self.increment.fire_if_due(now) {
            if let Some(handler) = self.on_increment.as_mut() {
                handler();
            }
            self.countdown = self.interval_secs;
            return Some(Event::AutoCountFired {
                interval_secs: self.interval_secs,
                at: self.clock.now(),
            });
        }
        if display_due {
            return Some(Event::AutoCountCountdown {
                seconds_until_next: self.countdown,
            });
        }
        None
    }

    fn rebuild(&mut self) {
        let now = self.clock.now_ms();
        self.display.cancel();
        self.increment.cancel();
        self.display.arm(now);
        self.increment.arm(now);
    }
}
