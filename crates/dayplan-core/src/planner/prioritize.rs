//! Candidate selection and ordering for the daily plan.

use chrono::NaiveDate;

use crate::storage::TaskDb;
use crate::task::{sunday_of_week, Task};

/// Cap on the number of tasks considered for one plan.
pub const MAX_CANDIDATES: usize = 30;

/// Select up to [`MAX_CANDIDATES`] incomplete tasks for planning.
///
/// Overdue and this-week tasks come first; if they don't fill the cap,
/// the remainder is topped up with tasks due after this week. Tasks
/// without a due date are never candidates.
pub fn candidate_tasks(
    db: &TaskDb,
    user: &str,
    today: NaiveDate,
) -> Result<Vec<Task>, rusqlite::Error> {
    let cutoff = sunday_of_week(today);
    let mut candidates = db.incomplete_due_by(user, cutoff, MAX_CANDIDATES)?;

    if candidates.len() < MAX_CANDIDATES {
        let remaining = MAX_CANDIDATES - candidates.len();
        let later = db.incomplete_due_after(user, cutoff, remaining)?;
        candidates.extend(later);
    }

    Ok(candidates)
}

/// Sort tasks into scheduling order (earlier = scheduled first):
/// overdue tasks, then by priority (1 = highest, missing = 99), then by
/// reschedule count (more reschedules pulled earlier), then due-today,
/// then position as the deterministic tiebreak.
pub fn sort_for_scheduling(tasks: &mut [Task], today: NaiveDate) {
    tasks.sort_by_key(|task| scheduling_key(task, today));
}

fn scheduling_key(task: &Task, today: NaiveDate) -> (i64, i64, i64, i64, i64) {
    let is_overdue = task.is_overdue(today);
    let is_due_today = task.due_date == Some(today);
    (
        if is_overdue { 0 } else { 1 },
        task.priority.unwrap_or(99),
        -task.reschedule_count,
        if is_due_today { 0 } else { 1 },
        task.position,
    )
}
