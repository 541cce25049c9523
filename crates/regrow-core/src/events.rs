use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionStatus;

/// How a rep was added to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepSource {
    Manual,
    AutoCount,
}

/// Every state change in the session engine produces an Event.
/// The shell renders them; the goal registry reacts to completions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        goal_id: String,
        at: DateTime<Utc>,
    },
    RepCounted {
        session_id: String,
        reps: u32,
        source: RepSource,
        /// Seconds the previous rep took, from the stopwatch.
        previous_interval_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    TimerStarted {
        total_seconds: u64,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerTick {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerFinished {
        total_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    StopwatchTicked {
        seconds: u64,
    },
    AutoCountStarted {
        interval_secs: u64,
        at: DateTime<Utc>,
    },
    AutoCountStopped {
        at: DateTime<Utc>,
    },
    AutoCountCountdown {
        seconds_until_next: u64,
    },
    AutoCountFired {
        interval_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        goal_id: String,
        reps: u32,
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    SessionAbandoned {
        session_id: String,
        goal_id: String,
        reps: u32,
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        session_id: String,
        goal_id: String,
        status: SessionStatus,
        reps: u32,
        target_reps: Option<u32>,
        remaining_seconds: Option<u64>,
        timer_running: bool,
        stopwatch_seconds: Option<u64>,
        auto_count_running: bool,
        auto_count_countdown: Option<u64>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// True for the two terminal session events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::SessionCompleted { .. } | Event::SessionAbandoned { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::AutoCountCountdown {
            seconds_until_next: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AutoCountCountdown");
        assert_eq!(json["seconds_until_next"], 3);
    }
}
