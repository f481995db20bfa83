mod config;
pub mod calendar_db;
pub mod task_db;

pub use calendar_db::CalendarDb;
pub use config::{Config, PlannerConfig, SchedulingWindows, SyncConfig, WindowRange};
pub use task_db::TaskDb;

use std::path::PathBuf;

/// Returns `~/.config/dayplan[-dev]/` based on DAYPLAN_ENV.
///
/// Set DAYPLAN_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DAYPLAN_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("dayplan-dev")
    } else {
        base_dir.join("dayplan")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
