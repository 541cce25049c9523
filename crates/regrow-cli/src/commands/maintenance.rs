use clap::Subcommand;

use super::Context;

#[derive(Subcommand)]
pub enum MaintenanceAction {
    /// Abandon orphaned sessions and trim session history
    Sweep {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: MaintenanceAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        MaintenanceAction::Sweep { json } => {
            let ctx = Context::open_unswept()?;
            let report = ctx.sweep();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "abandoned {} orphaned session(s), pruned {} of {}",
                    report.recovery.abandoned.len(),
                    report.prune.removed(),
                    report.prune.before
                );
            }
            if !report.recovery.persisted || !report.prune.persisted {
                return Err("sweep results could not be saved".into());
            }
        }
    }
    Ok(())
}
