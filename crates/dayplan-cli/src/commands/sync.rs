//! Calendar sync commands.

use clap::Subcommand;
use dayplan_core::storage::{CalendarDb, Config};
use dayplan_core::sync::SyncResult;
use dayplan_core::{GoogleCalendarProvider, SyncEngine};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Sync calendars from the provider
    Run {
        /// Sync only this calendar
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Show sync state for all known calendars
    Status,
    /// Enable sync for a calendar
    Enable {
        /// Calendar ID
        calendar_id: String,
    },
    /// Disable sync for a calendar
    Disable {
        /// Calendar ID
        calendar_id: String,
    },
}

pub fn run(user: &str, action: SyncAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = CalendarDb::open()?;

    match action {
        SyncAction::Run { calendar } => {
            let config = Config::load()?;
            let provider = GoogleCalendarProvider::new()?;
            let engine = SyncEngine::new(&provider, &db)
                .with_window(config.sync.days_back, config.sync.days_forward);

            let results = match calendar {
                Some(calendar_id) => vec![engine.sync_calendar(user, &calendar_id)?],
                None => engine.sync_all(user)?,
            };

            if results.is_empty() {
                println!("No calendars to sync.");
            }
            for result in &results {
                print_result(result);
            }
        }
        SyncAction::Status => {
            let states = db.all_sync_states(user)?;
            if states.is_empty() {
                println!("No calendars known yet. Run 'dayplan sync run' to discover them.");
            }
            for state in states {
                let last = state
                    .last_synced_at
                    .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{} [{}] {} - last synced: {}",
                    state.calendar_id,
                    if state.is_enabled { "enabled" } else { "disabled" },
                    state.calendar_name,
                    last,
                );
            }
        }
        SyncAction::Enable { calendar_id } => {
            if db.set_sync_enabled(user, &calendar_id, true)? {
                println!("Sync enabled for {calendar_id}");
            } else {
                return Err(format!("Unknown calendar: {calendar_id}").into());
            }
        }
        SyncAction::Disable { calendar_id } => {
            if db.set_sync_enabled(user, &calendar_id, false)? {
                println!("Sync disabled for {calendar_id}");
            } else {
                return Err(format!("Unknown calendar: {calendar_id}").into());
            }
        }
    }
    Ok(())
}

fn print_result(result: &SyncResult) {
    let kind = if result.full_sync_performed {
        "full"
    } else {
        "incremental"
    };
    println!(
        "{}: {} sync - {} created, {} updated, {} deleted",
        result.calendar_id, kind, result.created, result.updated, result.deleted,
    );
    for error in &result.errors {
        eprintln!("  {}: {error}", result.calendar_id);
    }
}
