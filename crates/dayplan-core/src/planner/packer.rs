//! Greedy placement of ordered tasks into free slots.

use super::availability::MinuteRange;
use super::TimeSlot;
use crate::task::Task;

/// Fallback duration for tasks without an estimate (minutes).
pub const DEFAULT_TASK_MINUTES: i64 = 30;

/// Pack tasks into slots in order.
///
/// A cursor walks the slots; each task is placed at the cursor when it
/// fits before the current slot's end, otherwise the cursor advances to
/// the next slot and the same task is retried. A task that fits in no
/// remaining slot is dropped from the plan, not deferred to another day.
pub fn pack_schedule(
    tasks: &[Task],
    slots: &[MinuteRange],
    default_minutes: i64,
) -> Vec<TimeSlot> {
    let mut schedule = Vec::new();
    let mut slot_idx = 0;
    let mut cursor = slots.first().map(|s| s.start).unwrap_or(0);

    for task in tasks {
        if slot_idx >= slots.len() {
            break;
        }
        let duration = task.estimated_minutes.unwrap_or(default_minutes);

        while slot_idx < slots.len() {
            let slot = slots[slot_idx];
            if cursor < slot.start {
                cursor = slot.start;
            }

            if cursor + duration <= slot.end {
                schedule.push(TimeSlot {
                    task_id: task.id.clone(),
                    start_time: format_minutes(cursor),
                    estimated_minutes: duration,
                });
                cursor += duration;
                break;
            }

            slot_idx += 1;
            if let Some(next) = slots.get(slot_idx) {
                cursor = next.start;
            }
        }
    }

    schedule
}

/// Format minutes from midnight as `"HH:MM"`.
pub fn format_minutes(minutes: i64) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
