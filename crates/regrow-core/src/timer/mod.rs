mod auto_count;
mod cadence;
mod countdown;
mod stopwatch;

pub use auto_count::AutoCounter;
pub use cadence::Cadence;
pub use countdown::{CountdownState, CountdownTimer, DEFAULT_TICK_MS};
pub use stopwatch::Stopwatch;
