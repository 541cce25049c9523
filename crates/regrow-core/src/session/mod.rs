mod attempt;
mod manager;
mod record;

pub use attempt::{Attempt, AttemptOptions, SessionOutcome};
pub use manager::{CompletionSink, NoopSink, SessionManager};
pub use record::{Session, SessionStatus, SessionUpdate};
