use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use regrow_core::feedback::{silent, Feedback, SharedFeedback};
use regrow_core::format::format_time;
use regrow_core::{Attempt, AttemptOptions, Event, ValidationError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use super::Context;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session against a goal, reading commands from stdin
    ///
    /// Commands: `+` rep, `s` start/pause timer, `a` toggle auto-count,
    /// `f` finish early, `q` abandon, `r` repeat, `?` status, `x` exit.
    Run {
        /// Goal ID
        goal_id: String,
    },
    /// List stored sessions
    List {
        /// Only sessions of this goal
        #[arg(long)]
        goal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Rings the terminal bell on stderr.
struct Bell;

impl Feedback for Bell {
    fn pulse(&self, _ms: u64) {
        let mut err = std::io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }
}

enum Input {
    Increment,
    ToggleTimer,
    ToggleAutoCount,
    FinishEarly,
    Abandon,
    Repeat,
    Status,
    Exit,
}

impl Input {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "+" => Some(Self::Increment),
            "s" => Some(Self::ToggleTimer),
            "a" => Some(Self::ToggleAutoCount),
            "f" => Some(Self::FinishEarly),
            "q" => Some(Self::Abandon),
            "r" => Some(Self::Repeat),
            "?" => Some(Self::Status),
            "x" => Some(Self::Exit),
            _ => None,
        }
    }
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;

    match action {
        SessionAction::Run { goal_id } => {
            let registry = ctx.registry();
            let goal = registry.get(&goal_id).ok_or(ValidationError::NotFound {
                kind: "goal".into(),
                id: goal_id.clone(),
            })?;
            let feedback: SharedFeedback = if ctx.config.feedback.haptics {
                Arc::new(Bell)
            } else {
                silent()
            };
            let options = AttemptOptions::from(&ctx.config);
            let (attempt, started) =
                Attempt::begin(goal, ctx.manager(), registry, feedback, options);
            emit(&[started])?;

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(drive(attempt, options.tick_ms))?;
        }
        SessionAction::List { goal, json } => {
            let mut sessions = match goal {
                Some(id) => ctx.store.sessions_by_goal(&id),
                None => ctx.store.sessions(),
            };
            sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("No sessions.");
            } else {
                for s in &sessions {
                    println!(
                        "{}  {}  {:<9}  reps {}  {}",
                        s.started_at.format("%Y-%m-%d %H:%M"),
                        s.id,
                        s.status.as_str(),
                        s.current_reps,
                        format_time(s.elapsed_seconds)
                    );
                }
            }
        }
    }
    Ok(())
}

/// Tick the attempt and apply stdin commands until exit or end of input.
///
/// Leaving while the session is still active abandons it, including when
/// reading stdin or writing stdout fails.
async fn drive(mut attempt: Attempt, tick_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    let result = pump(&mut attempt, tick_ms).await;

    if !attempt.is_terminal() {
        let events = attempt.abandon();
        if let Err(e) = emit(&events) {
            tracing::warn!(error = %e, "failed to report abandoned session");
        }
    }
    result
}

async fn pump(attempt: &mut Attempt, tick_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => emit(&attempt.tick())?,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let events = match Input::parse(&line) {
                    Some(Input::Increment) => attempt.increment(),
                    Some(Input::ToggleTimer) => attempt.toggle_timer(),
                    Some(Input::ToggleAutoCount) => attempt.toggle_auto_count(),
                    Some(Input::FinishEarly) => attempt.finish_early(),
                    Some(Input::Abandon) => attempt.abandon(),
                    Some(Input::Repeat) => attempt.repeat(),
                    Some(Input::Status) => vec![attempt.snapshot()],
                    Some(Input::Exit) => break,
                    None => {
                        tracing::warn!(input = line.trim(), "unknown command");
                        Vec::new()
                    }
                };
                emit(&events)?;
            }
        }
    }
    Ok(())
}

/// One JSON object per line on stdout.
fn emit(events: &[Event]) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = std::io::stdout().lock();
    for event in events {
        serde_json::to_writer(&mut out, event)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
