//! Haptic-style feedback sink.
//!
//! Reps and auto-count starts pulse the sink. The core never knows what the
//! pulse turns into; the CLI rings the terminal bell.

use std::sync::Arc;

/// Default pulse length in milliseconds.
pub const DEFAULT_PULSE_MS: u64 = 30;

pub trait Feedback: Send + Sync {
    fn pulse(&self, ms: u64);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn pulse(&self, _ms: u64) {}
}

pub type SharedFeedback = Arc<dyn Feedback>;

pub fn silent() -> SharedFeedback {
    Arc::new(NoFeedback)
}
