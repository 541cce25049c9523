use clap::Subcommand;

use super::Context;

#[derive(Subcommand)]
pub enum CalendarAction {
    /// Show the calendar view
    Show,
    /// Hide the calendar view
    Hide,
    /// Print whether the calendar view is visible
    Status,
}

pub fn run(action: CalendarAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let visible = match action {
        CalendarAction::Show => set_visible(&ctx, true)?,
        CalendarAction::Hide => set_visible(&ctx, false)?,
        CalendarAction::Status => ctx.store.calendar_visible(),
    };
    println!("calendar: {}", if visible { "visible" } else { "hidden" });
    Ok(())
}

fn set_visible(ctx: &Context, visible: bool) -> Result<bool, Box<dyn std::error::Error>> {
    if !ctx.store.set_calendar_visible(visible) {
        return Err("failed to save calendar visibility".into());
    }
    Ok(visible)
}
