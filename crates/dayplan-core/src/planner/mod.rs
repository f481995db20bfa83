//! Deterministic daily planner.
//!
//! Combines the configured scheduling windows, the cached calendar
//! events, and the pending tasks into a proposed schedule for one day:
//! - `availability` subtracts busy periods from scheduling windows
//! - `prioritize` selects and orders a bounded candidate set of tasks
//! - `packer` greedily assigns tasks into the remaining free slots
//!
//! The computation is pure and synchronous; empty inputs yield an empty
//! plan rather than an error.

pub mod availability;
pub mod packer;
pub mod prioritize;

pub use availability::{free_slots, MinuteRange};
pub use packer::{pack_schedule, DEFAULT_TASK_MINUTES};
pub use prioritize::{candidate_tasks, sort_for_scheduling, MAX_CANDIDATES};

use chrono::{Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{CalendarDb, Config, TaskDb};
use crate::sync::types::CachedEvent;
use crate::task::Task;

/// One scheduled entry in a proposed plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub task_id: String,
    /// `"HH:MM"` start time within the planned day.
    pub start_time: String,
    pub estimated_minutes: i64,
}

/// A proposed daily schedule. Transient: recomputed on every request,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedPlan {
    pub message: String,
    pub schedule: Vec<TimeSlot>,
}

/// Orchestrates one day's plan from storage and configuration.
pub struct DailyPlanner<'a> {
    tasks: &'a TaskDb,
    calendar: &'a CalendarDb,
    config: &'a Config,
}

impl<'a> DailyPlanner<'a> {
    pub fn new(tasks: &'a TaskDb, calendar: &'a CalendarDb, config: &'a Config) -> Self {
        Self {
            tasks,
            calendar,
            config,
        }
    }

    /// Build the proposed plan for `user` on `day`.
    pub fn plan_for(&self, user: &str, day: NaiveDate) -> Result<ProposedPlan> {
        let windows = self.config.windows.for_weekday(day.weekday());

        let day_start = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let day_end = day.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc();
        let events = self.calendar.events_in_range(user, day_start, day_end)?;
        let busy = busy_periods(&events, day);

        let slots = free_slots(&windows, &busy);

        let mut tasks = candidate_tasks(self.tasks, user, day)?;
        sort_for_scheduling(&mut tasks, day);

        let schedule = pack_schedule(&tasks, &slots, self.config.planner.default_task_minutes);
        let message = plan_message(&tasks, &schedule, day);

        Ok(ProposedPlan { message, schedule })
    }

    /// Plan for today (UTC).
    pub fn plan_for_today(&self, user: &str) -> Result<ProposedPlan> {
        self.plan_for(user, Utc::now().date_naive())
    }
}

/// Busy periods for `day` in minutes from midnight: non-all-day events
/// that start on that date. All-day events never block scheduling.
pub fn busy_periods(events: &[CachedEvent], day: NaiveDate) -> Vec<MinuteRange> {
    let mut busy: Vec<MinuteRange> = events
        .iter()
        .filter(|e| !e.all_day && e.start.date_naive() == day)
        .map(|e| {
            MinuteRange::new(
                (e.start.hour() * 60 + e.start.minute()) as i64,
                (e.end.hour() * 60 + e.end.minute()) as i64,
            )
        })
        .collect();
    busy.sort();
    busy
}

/// Summary line for a plan. Pure function of the candidate set and the
/// computed schedule; no randomness.
pub fn plan_message(tasks: &[Task], schedule: &[TimeSlot], today: NaiveDate) -> String {
    let overdue = tasks.iter().filter(|t| t.is_overdue(today)).count();
    let high_priority = tasks.iter().filter(|t| t.priority == Some(1)).count();

    if overdue > 0 {
        format!(
            "You have {overdue} overdue task{} to tackle today. Let's get through them!",
            if overdue > 1 { "s" } else { "" }
        )
    } else if high_priority > 0 {
        format!(
            "You have {high_priority} high-priority task{} today. Focus on what matters most.",
            if high_priority > 1 { "s" } else { "" }
        )
    } else if schedule.len() > 5 {
        "Busy day ahead! Take it one task at a time.".to_string()
    } else if !schedule.is_empty() {
        "Here's your plan for today. You've got this!".to_string()
    } else {
        "Looks like a light day. Great time to get ahead on upcoming tasks.".to_string()
    }
}
