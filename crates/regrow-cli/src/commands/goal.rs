use clap::Subcommand;
use regrow_core::format::{format_goal_target, format_relative_time, format_time};
use regrow_core::{GoalDraft, GoalUpdate, Session, SessionStatus};

use super::Context;

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a goal
    Add {
        /// Goal name
        name: String,
        /// Rep target
        #[arg(long, conflicts_with = "seconds")]
        reps: Option<u32>,
        /// Time target in seconds
        #[arg(long)]
        seconds: Option<u32>,
        /// Display icon
        #[arg(long, default_value = "")]
        icon: String,
        /// Add a rep every N seconds (rep goals only)
        #[arg(long)]
        auto_count: Option<u32>,
        /// Hide the rep-pace stopwatch
        #[arg(long)]
        no_stopwatch: bool,
    },
    /// Change an existing goal
    Edit {
        /// Goal ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New display icon
        #[arg(long)]
        icon: Option<String>,
        /// Make it a rep goal with this target
        #[arg(long, conflicts_with = "seconds")]
        reps: Option<u32>,
        /// Make it a time goal with this target in seconds
        #[arg(long)]
        seconds: Option<u32>,
        /// Add a rep every N seconds (rep goals only)
        #[arg(long, conflicts_with = "no_auto_count")]
        auto_count: Option<u32>,
        /// Count reps by hand again
        #[arg(long)]
        no_auto_count: bool,
        /// Show the rep-pace stopwatch
        #[arg(long, conflicts_with = "no_stopwatch")]
        stopwatch: bool,
        /// Hide the rep-pace stopwatch
        #[arg(long)]
        no_stopwatch: bool,
    },
    /// List goals
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a goal with its session totals
    Show {
        /// Goal ID
        id: String,
    },
    /// Delete a goal and its sessions
    Remove {
        /// Goal ID
        id: String,
    },
}

pub fn run(action: GoalAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let registry = ctx.registry();

    match action {
        GoalAction::Add {
            name,
            reps,
            seconds,
            icon,
            auto_count,
            no_stopwatch,
        } => {
            let mut draft = match (reps, seconds) {
                (Some(n), None) => GoalDraft::reps(&name, n),
                (None, Some(s)) => GoalDraft::timed(&name, s),
                _ => return Err("one of --reps or --seconds is required".into()),
            };
            if let Some(secs) = auto_count {
                draft = draft.with_auto_count(secs);
            }
            draft.show_stopwatch = !no_stopwatch;
            let goal = registry.add_goal(draft.with_icon(&icon))?;
            println!("{}", serde_json::to_string_pretty(&goal)?);
        }
        GoalAction::Edit {
            id,
            name,
            icon,
            reps,
            seconds,
            auto_count,
            no_auto_count,
            stopwatch,
            no_stopwatch,
        } => {
            let mut update = GoalUpdate {
                name,
                icon,
                ..Default::default()
            };
            if let Some(n) = reps {
                update = update.with_rep_target(n);
            }
            if let Some(s) = seconds {
                update = update.with_time_target(s);
            }
            if let Some(secs) = auto_count {
                update.auto_count_interval = Some(Some(secs));
            } else if no_auto_count {
                update.auto_count_interval = Some(None);
            }
            if stopwatch || no_stopwatch {
                update.show_stopwatch = Some(stopwatch);
            }
            if update.is_empty() {
                return Err("nothing to change".into());
            }
            registry.update_goal(&id, &update)?;
            let goal = registry
                .get(&id)
                .ok_or_else(|| format!("goal not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&goal)?);
        }
        GoalAction::List { json } => {
            let goals = registry.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(goals.as_ref())?);
            } else if goals.is_empty() {
                println!("No goals.");
            } else {
                let now = ctx.clock.now();
                for goal in goals.iter() {
                    let last = goal
                        .last_completed_at
                        .map(|at| format!("  · {}", format_relative_time(at, now)))
                        .unwrap_or_default();
                    println!(
                        "{}  {} {}  {}  done {}{}",
                        goal.id,
                        goal.icon,
                        goal.name,
                        format_goal_target(goal),
                        goal.completed_count,
                        last
                    );
                }
            }
        }
        GoalAction::Show { id } => {
            let goal = registry
                .get(&id)
                .ok_or_else(|| format!("goal not found: {id}"))?;
            let sessions = ctx.store.sessions_by_goal(&id);
            let summary = summarize(&sessions);
            let out = serde_json::json!({
                "goal": goal,
                "sessions": summary,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        GoalAction::Remove { id } => {
            if registry.get(&id).is_none() {
                return Err(format!("goal not found: {id}").into());
            }
            if !registry.delete_goal(&id) {
                return Err(format!("failed to delete goal: {id}").into());
            }
            println!("goal removed: {id}");
        }
    }
    Ok(())
}

fn summarize(sessions: &[Session]) -> serde_json::Value {
    let count = |status: SessionStatus| sessions.iter().filter(|s| s.status == status).count();
    let total_seconds: u64 = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .map(|s| s.elapsed_seconds)
        .sum();
    serde_json::json!({
        "total": sessions.len(),
        "completed": count(SessionStatus::Completed),
        "abandoned": count(SessionStatus::Abandoned),
        "active": count(SessionStatus::Active),
        "completedTime": format_time(total_seconds),
    })
}
