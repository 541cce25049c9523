//! # Regrow Core Library
//!
//! This library provides the session engine behind the Regrow habit tracker.
//! Users define goals (rep-based or time-based) and run sessions against
//! them; this crate times those sessions, decides when they end, and keeps
//! the history bounded. The CLI is a thin shell over the same library.
//!
//! ## Architecture
//!
//! - **Timers**: wall-clock-based countdown, stopwatch and auto-count ticker.
//!   None of them own a thread; the caller periodically invokes `tick()`
//! - **Sessions**: the `active -> completed | abandoned` lifecycle and the
//!   [`Attempt`] runtime that bridges a goal to its timers
//! - **Storage**: goal and session collections over a key-value backend
//!   (SQLite by default) plus TOML configuration
//! - **Recovery**: startup orphan recovery and retention sweep
//!
//! ## Key Components
//!
//! - [`CountdownTimer`], [`Stopwatch`], [`AutoCounter`]: timer subsystems
//! - [`SessionManager`]: session persistence lifecycle
//! - [`Attempt`]: one user interaction with a goal
//! - [`Store`]: record store
//! - [`GoalRegistry`]: observable goal list

pub mod clock;
pub mod error;
pub mod events;
pub mod feedback;
pub mod format;
pub mod goals;
pub mod recovery;
pub mod session;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::{Event, RepSource};
pub use feedback::{Feedback, NoFeedback, SharedFeedback};
pub use goals::{Goal, GoalDraft, GoalMode, GoalRegistry, GoalType, GoalUpdate};
pub use recovery::{startup_sweep, RetentionPolicy, SweepReport};
pub use session::{
    Attempt, AttemptOptions, CompletionSink, Session, SessionManager, SessionOutcome,
    SessionStatus,
};
pub use storage::{Config, SharedStore, Store};
pub use timer::{AutoCounter, CountdownState, CountdownTimer, Stopwatch};
