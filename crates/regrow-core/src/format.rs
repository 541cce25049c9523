//! Display helpers shared by shells.

use chrono::{DateTime, Utc};

use crate::goals::{Goal, GoalType};

/// `m:ss`, minutes unbounded.
pub fn format_time(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Short target label: `×10` for reps, `m:ss` for time goals.
pub fn format_goal_target(goal: &Goal) -> String {
    match goal.kind {
        GoalType::Reps => format!("×{}", goal.target_reps.unwrap_or(0)),
        GoalType::Time => format_time(u64::from(goal.target_seconds.unwrap_or(0))),
    }
}

/// Coarse age of `then` as seen at `now`: "just now", "5 minutes ago",
/// "2 weeks ago". Timestamps in the future read as "just now".
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return ago(minutes, "minute");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return ago(hours, "hour");
    }
    let days = hours / 24;
    if days < 7 {
        return ago(days, "day");
    }
    if days < 30 {
        return ago(days / 7, "week");
    }
    ago(days / 30, "month")
}

fn ago(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
