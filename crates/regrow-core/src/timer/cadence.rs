//! Cancellable periodic trigger.
//!
//! A cadence is a deadline plus a period. It never fires on its own: the
//! owner calls [`Cadence::fire_if_due`] from its `tick()`. Cancelling clears
//! the deadline, so no late firing can happen once `cancel()` returns.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    period_ms: u64,
    next_due_ms: Option<u64>,
}

impl Cadence {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next_due_ms: None,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.next_due_ms
    }

    pub fn is_armed(&self) -> bool {
        self.next_due_ms.is_some()
    }

    /// Schedule the first firing one period after `now_ms`.
    pub fn arm(&mut self, now_ms: u64) {
        self.next_due_ms = Some(now_ms.saturating_add(self.period_ms));
    }

    pub fn cancel(&mut self) {
        self.next_due_ms = None;
    }

    /// Returns true at most once per call when the deadline has passed.
    ///
    /// Missed periods are skipped: after a long gap the next deadline lands
    /// on the first period boundary after `now_ms` rather than bursting.
    pub fn fire_if_due(&mut self, now_ms: u64) -> bool {
        let Some(due) = self.next_due_ms else {
            return false;
        };
        if now_ms < due {
            return false;
        }
        let behind = now_ms - due;
        let skipped = behind / self.period_ms;
        self.next_due_ms = Some(due + (skipped + 1) * self.period_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_cadence_never_fires() {
        let mut c = Cadence::new(1000);
        assert!(!c.fire_if_due(10_000));
    }

    #[test]
    fn fires_once_per_period() {
        let mut c = Cadence::new(1000);
        c.arm(0);
        assert!(!c.fire_if_due(999));
        assert!(c.fire_if_due(1000));
        assert!(!c.fire_if_due(1500));
        assert!(c.fire_if_due(2000));
    }

    #[test]
    fn skips_missed_periods_without_burst() {
        let mut c = Cadence::new(1000);
        c.arm(0);
        assert!(c.fire_if_due(5_400));
        assert!(!c.fire_if_due(5_900));
        assert_eq!(c.next_due_ms(), Some(6_000));
    }

    #[test]
    fn cancel_prevents_late_fire() {
        let mut c = Cadence::new(200);
        c.arm(0);
        c.cancel();
        assert!(!c.fire_if_due(10_000));
    }

    #[test]
    fn zero_period_is_clamped() {
        let c = Cadence::new(0);
        assert_eq!(c.period_ms(), 1);
    }
}
