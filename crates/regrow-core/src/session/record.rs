//! Persisted session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One-way session state machine: `active -> completed | abandoned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        self != SessionStatus::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt at a goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub goal_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_reps: u32,
    pub elapsed_seconds: u64,
    pub status: SessionStatus,
}

impl Session {
    /// A fresh active session with a new id.
    pub fn begin(goal_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            goal_id: goal_id.to_string(),
            started_at,
            completed_at: None,
            current_reps: 0,
            elapsed_seconds: 0,
            status: SessionStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Partial update merged into a stored session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_reps: Option<u32>,
    pub elapsed_seconds: Option<u64>,
}

impl SessionUpdate {
    /// The update that closes a session with frozen counters.
    pub fn terminal(
        status: SessionStatus,
        at: DateTime<Utc>,
        reps: u32,
        elapsed_seconds: u64,
    ) -> Self {
        Self {
            status: Some(status),
            completed_at: Some(at),
            current_reps: Some(reps),
            elapsed_seconds: Some(elapsed_seconds),
        }
    }

    pub fn apply(&self, session: &mut Session) {
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(at) = self.completed_at {
            session.completed_at = Some(at);
        }
        if let Some(reps) = self.current_reps {
            session.current_reps = reps;
        }
        if let Some(elapsed) = self.elapsed_seconds {
            session.elapsed_seconds = elapsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_json_uses_wire_field_names() {
        let at = "2025-03-01T08:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let session = Session::begin("goal-1", at);
        let json = serde_json::to_value(&session).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "id",
            "goalId",
            "startedAt",
            "completedAt",
            "currentReps",
            "elapsedSeconds",
            "status",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 7);
        assert_eq!(json["status"], "active");
        assert!(json["completedAt"].is_null());
    }

    #[test]
    fn reads_browser_style_timestamps() {
        let raw = r#"{"id":"s1","goalId":"g1","startedAt":"2025-03-01T08:00:00.123Z",
            "completedAt":null,"currentReps":2,"elapsedSeconds":40,"status":"abandoned"}"#;
        let session: Session = serde_json::from_str(raw).unwrap();
        assert_eq!(session.status, SessionStatus::Abandoned);
        assert_eq!(session.current_reps, 2);
    }

    #[test]
    fn update_merges_only_present_fields() {
        let at = Utc::now();
        let mut session = Session::begin("g", at);
        SessionUpdate {
            current_reps: Some(4),
            ..Default::default()
        }
        .apply(&mut session);
        assert_eq!(session.current_reps, 4);
        assert!(session.is_active());
        assert!(session.completed_at.is_none());
    }
}
