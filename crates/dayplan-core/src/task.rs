//! Task types and due-date horizon helpers.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// A task to be planned. The planner treats tasks as read-only input;
/// mutation happens through [`crate::storage::TaskDb`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user: String,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub estimated_minutes: Option<i64>,
    /// 1 = highest urgency.
    pub priority: Option<i64>,
    pub position: i64,
    pub reschedule_count: i64,
    pub completed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Task {
    /// Whether the task is past due relative to `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.due_date, Some(due) if due < today)
    }

    /// Which planning column the task falls into, derived from its due date.
    pub fn time_horizon(&self, today: NaiveDate) -> TimeHorizon {
        let Some(due) = self.due_date else {
            return TimeHorizon::Backlog;
        };
        let this_sunday = sunday_of_week(today);
        let next_sunday = this_sunday + Days::new(7);

        if due <= today {
            TimeHorizon::Today
        } else if due <= this_sunday {
            TimeHorizon::ThisWeek
        } else if due <= next_sunday {
            TimeHorizon::NextWeek
        } else {
            TimeHorizon::Later
        }
    }
}

/// Planning column for a task, computed from its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeHorizon {
    Today,
    ThisWeek,
    NextWeek,
    Later,
    Backlog,
}

impl TimeHorizon {
    /// Representative due date when a task is filed under this horizon.
    /// `Backlog` tasks carry no due date.
    pub fn due_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeHorizon::Today => Some(today),
            TimeHorizon::ThisWeek => Some(sunday_of_week(today)),
            TimeHorizon::NextWeek => Some(sunday_of_week(today) + Days::new(7)),
            TimeHorizon::Later => Some(end_of_month(today)),
            TimeHorizon::Backlog => None,
        }
    }
}

/// The Sunday of the week containing `d` (weeks run Monday..Sunday).
pub fn sunday_of_week(d: NaiveDate) -> NaiveDate {
    let days_until_sunday = 6 - d.weekday().num_days_from_monday() as u64;
    d + Days::new(days_until_sunday)
}

/// The last day of the month containing `d`.
pub fn end_of_month(d: NaiveDate) -> NaiveDate {
    let (year, month) = if d.month() == 12 {
        (d.year() + 1, 1)
    } else {
        (d.year(), d.month() + 1)
    };
    // First of next month always exists.
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| first - Days::new(1))
        .unwrap_or(d)
}
