//! Daily plan commands.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use dayplan_core::storage::{CalendarDb, Config, TaskDb};
use dayplan_core::DailyPlanner;

#[derive(Subcommand)]
pub enum PlanAction {
    /// Propose a schedule for a day
    Show {
        /// Day to plan, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(user: &str, action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PlanAction::Show { date, json } => {
            let day = match date {
                Some(raw) => raw
                    .parse::<NaiveDate>()
                    .map_err(|_| format!("Invalid date (expected YYYY-MM-DD): {raw}"))?,
                None => Utc::now().date_naive(),
            };

            let tasks = TaskDb::open()?;
            let calendar = CalendarDb::open()?;
            let config = Config::load()?;
            let plan = DailyPlanner::new(&tasks, &calendar, &config).plan_for(user, day)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                return Ok(());
            }

            println!("{}", plan.message);
            if plan.schedule.is_empty() {
                println!("Nothing scheduled for {day}.");
            }
            for slot in &plan.schedule {
                let title = tasks
                    .get_task(user, &slot.task_id)?
                    .map(|t| t.title)
                    .unwrap_or_else(|| slot.task_id.clone());
                println!("{}  {} ({}m)", slot.start_time, title, slot.estimated_minutes);
            }
        }
    }
    Ok(())
}
