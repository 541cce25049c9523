//! Goal records as stored by the application shell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Reps,
    Time,
}

/// A habit target. The session engine reads it but never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: GoalType,
    pub target_reps: Option<u32>,
    pub target_seconds: Option<u32>,
    pub completed_count: u32,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_stopwatch: Option<bool>,
    #[serde(default)]
    pub auto_count_interval: Option<u32>,
}

/// Which subsystems a session against this goal uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalMode {
    /// Tap to add a rep; the stopwatch may show rep pace.
    ManualReps { target: Option<u32>, stopwatch: bool },
    /// Reps are added on an interval; no stopwatch.
    AutoCount { target: Option<u32>, interval_secs: u32 },
    /// Countdown to `seconds`.
    Timed { seconds: u32 },
}

impl Goal {
    /// Absent means shown.
    pub fn shows_stopwatch(&self) -> bool {
        self.show_stopwatch.unwrap_or(true)
    }

    /// Auto-count only applies to rep goals with a positive interval.
    pub fn auto_count_secs(&self) -> Option<u32> {
        match (self.kind, self.auto_count_interval) {
            (GoalType::Reps, Some(secs)) if secs > 0 => Some(secs),
            _ => None,
        }
    }

    pub fn mode(&self) -> GoalMode {
        match self.kind {
            GoalType::Time => GoalMode::Timed {
                seconds: self.target_seconds.unwrap_or(0),
            },
            GoalType::Reps => match self.auto_count_secs() {
                Some(interval_secs) => GoalMode::AutoCount {
                    target: self.target_reps,
                    interval_secs,
                },
                None => GoalMode::ManualReps {
                    target: self.target_reps,
                    stopwatch: self.shows_stopwatch(),
                },
            },
        }
    }

    /// Rep threshold that completes a session, if this is a rep goal.
    pub fn rep_target(&self) -> Option<u32> {
        match self.kind {
            GoalType::Reps => self.target_reps.filter(|n| *n > 0),
            GoalType::Time => None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "must not be empty"));
        }
        validate_fields(
            self.kind,
            self.target_reps,
            self.target_seconds,
            self.auto_count_interval,
        )
    }
}

/// User-editable goal fields, as submitted by a form or the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalDraft {
    pub name: String,
    pub icon: String,
    pub kind: GoalType,
    pub target_reps: Option<u32>,
    pub target_seconds: Option<u32>,
    pub show_stopwatch: bool,
    pub auto_count_interval: Option<u32>,
}

impl GoalDraft {
    pub fn reps(name: &str, target: u32) -> Self {
        Self {
            name: name.to_string(),
            icon: String::new(),
            kind: GoalType::Reps,
            target_reps: Some(target),
            target_seconds: None,
            show_stopwatch: true,
            auto_count_interval: None,
        }
    }

    pub fn timed(name: &str, seconds: u32) -> Self {
        Self {
            name: name.to_string(),
            icon: String::new(),
            kind: GoalType::Time,
            target_reps: None,
            target_seconds: Some(seconds),
            show_stopwatch: true,
            auto_count_interval: None,
        }
    }

    pub fn with_auto_count(mut self, interval_secs: u32) -> Self {
        self.auto_count_interval = Some(interval_secs);
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "must not be empty"));
        }
        validate_fields(
            self.kind,
            self.target_reps,
            self.target_seconds,
            self.auto_count_interval,
        )
    }

    /// Build the stored goal with a fresh id and zeroed counters.
    pub fn into_goal(self, created_at: DateTime<Utc>) -> Goal {
        Goal {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            icon: self.icon,
            kind: self.kind,
            target_reps: self.target_reps,
            target_seconds: self.target_seconds,
            completed_count: 0,
            last_completed_at: None,
            created_at,
            show_stopwatch: Some(self.show_stopwatch),
            auto_count_interval: self.auto_count_interval,
        }
    }
}

/// Partial update merged into a stored goal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalUpdate {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub kind: Option<GoalType>,
    pub target_reps: Option<Option<u32>>,
    pub target_seconds: Option<Option<u32>>,
    pub show_stopwatch: Option<bool>,
    pub auto_count_interval: Option<Option<u32>>,
    pub completed_count: Option<u32>,
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl GoalUpdate {
    /// Turn the goal into a rep goal with `target` reps.
    pub fn with_rep_target(mut self, target: u32) -> Self {
        self.kind = Some(GoalType::Reps);
        self.target_reps = Some(Some(target));
        self.target_seconds = Some(None);
        self
    }

    /// Turn the goal into a time goal. Auto-count is dropped with the reps.
    pub fn with_time_target(mut self, seconds: u32) -> Self {
        self.kind = Some(GoalType::Time);
        self.target_seconds = Some(Some(seconds));
        self.target_reps = Some(None);
        self.auto_count_interval = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, goal: &mut Goal) {
        if let Some(name) = &self.name {
            goal.name = name.clone();
        }
        if let Some(icon) = &self.icon {
            goal.icon = icon.clone();
        }
        if let Some(kind) = self.kind {
            goal.kind = kind;
        }
        if let Some(reps) = self.target_reps {
            goal.target_reps = reps;
        }
        if let Some(secs) = self.target_seconds {
            goal.target_seconds = secs;
        }
        if let Some(show) = self.show_stopwatch {
            goal.show_stopwatch = Some(show);
        }
        if let Some(interval) = self.auto_count_interval {
            goal.auto_count_interval = interval;
        }
        if let Some(count) = self.completed_count {
            goal.completed_count = count;
        }
        if let Some(at) = self.last_completed_at {
            goal.last_completed_at = Some(at);
        }
    }
}

fn validate_fields(
    kind: GoalType,
    target_reps: Option<u32>,
    target_seconds: Option<u32>,
    auto_count_interval: Option<u32>,
) -> Result<(), ValidationError> {
    match kind {
        GoalType::Reps => {
            if !matches!(target_reps, Some(n) if n > 0) {
                return Err(ValidationError::invalid(
                    "targetReps",
                    "rep goals need a positive target",
                ));
            }
        }
        GoalType::Time => {
            if !matches!(target_seconds, Some(n) if n > 0) {
                return Err(ValidationError::invalid(
                    "targetSeconds",
                    "time goals need a positive duration",
                ));
            }
            if matches!(auto_count_interval, Some(n) if n > 0) {
                return Err(ValidationError::invalid(
                    "autoCountInterval",
                    "auto-count only applies to rep goals",
                ));
            }
        }
    }
    Ok(())
}
