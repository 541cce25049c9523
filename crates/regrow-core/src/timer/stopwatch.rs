//! Rep-pace stopwatch.
//!
//! Counts whole seconds while mounted. Each rep calls `reset()`, which keeps
//! the value that just ended as `previous` so the shell can show how long the
//! last rep took.

use super::cadence::Cadence;
use crate::clock::SharedClock;
use crate::events::Event;

const SECOND_MS: u64 = 1000;

#[derive(Clone)]
pub struct Stopwatch {
    clock: SharedClock,
    seconds: u64,
    previous: Option<u64>,
    cadence: Cadence,
}

impl std::fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stopwatch")
            .field("seconds", &self.seconds)
            .field("previous", &self.previous)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

impl Stopwatch {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_period_ms(clock, SECOND_MS)
    }

    pub fn with_period_ms(clock: SharedClock, period_ms: u64) -> Self {
        Self {
            clock,
            seconds: 0,
            previous: None,
            cadence: Cadence::new(period_ms),
        }
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    /// Duration of the last completed interval, if any rep happened yet.
    pub fn previous(&self) -> Option<u64> {
        self.previous
    }

    pub fn is_mounted(&self) -> bool {
        self.cadence.is_armed()
    }

    /// Begin counting. Mounting twice does not restart the count.
    pub fn mount(&mut self) {
        if !self.is_mounted() {
            self.cadence.arm(self.clock.now_ms());
        }
    }

    pub fn unmount(&mut self) {
        self.cadence.cancel();
    }

    /// Close the current interval and start a new one from zero.
    pub fn reset(&mut self) {
        self.previous = Some(self.seconds);
        self.seconds = 0;
        if self.is_mounted() {
            self.cadence.arm(self.clock.now_ms());
        }
    }

    /// Back to the freshly constructed state, keeping the mount status.
    pub fn clear(&mut self) {
        self.previous = None;
        self.seconds = 0;
        if self.is_mounted() {
            self.cadence.arm(self.clock.now_ms());
        }
    }

    pub fn tick(&mut self) -> Option<Event> {
        if !self.cadence.fire_if_due(self.clock.now_ms()) {
            return None;
        }
        self.seconds += 1;
        Some(Event::StopwatchTicked {
            seconds: self.seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn counts_only_while_mounted() {
        let clock = ManualClock::at_epoch_2025();
        let mut sw = Stopwatch::new(clock.shared());
        clock.advance_secs(1);
        assert!(sw.tick().is_none());

        sw.mount();
        for _ in 0..3 {
            clock.advance_secs(1);
            sw.tick();
        }
        assert_eq!(sw.seconds(), 3);

        sw.unmount();
        clock.advance_secs(1);
        assert!(sw.tick().is_none());
        assert_eq!(sw.seconds(), 3);
    }

    #[test]
    fn reset_keeps_previous_interval() {
        let clock = ManualClock::at_epoch_2025();
        let mut sw = Stopwatch::new(clock.shared());
        sw.mount();
        assert_eq!(sw.previous(), None);
        for _ in 0..4 {
            clock.advance_secs(1);
            sw.tick();
        }
        sw.reset();
        assert_eq!(sw.previous(), Some(4));
        assert_eq!(sw.seconds(), 0);

        clock.advance_ms(999);
        assert!(sw.tick().is_none());
        clock.advance_ms(1);
        assert!(matches!(sw.tick(), Some(Event::StopwatchTicked { seconds: 1 })));
    }

    #[test]
    fn clear_forgets_previous() {
        let clock = ManualClock::at_epoch_2025();
        let mut sw = Stopwatch::new(clock.shared());
        sw.mount();
        sw.reset();
        sw.clear();
        assert_eq!(sw.previous(), None);
        assert!(sw.is_mounted());
    }
}
