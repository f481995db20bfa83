//! Free-slot computation for a single day.
//!
//! Subtracts busy periods (cached calendar events) from the configured
//! scheduling windows, leaving the free intervals the packer can fill.

use serde::{Deserialize, Serialize};

/// A half-open interval in minutes from midnight, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MinuteRange {
    pub start: i64,
    pub end: i64,
}

impl MinuteRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Duration in minutes.
    pub fn minutes(&self) -> i64 {
        self.end - self.start
    }

    /// Whether two ranges share any minutes.
    pub fn overlaps(&self, other: &MinuteRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Compute the free slots of a day: `windows` minus `busy`, sorted
/// ascending by start.
///
/// Each window starts as one candidate free interval; every busy period
/// splits the intervals it intersects into the parts before and after
/// the overlap, dropping fully covered ones. Busy periods outside a
/// window leave it unchanged.
pub fn free_slots(windows: &[MinuteRange], busy: &[MinuteRange]) -> Vec<MinuteRange> {
    let mut busy = busy.to_vec();
    busy.sort();

    let mut free: Vec<MinuteRange> = Vec::new();
    for window in windows {
        let mut slots = vec![*window];
        for block in &busy {
            let mut next = Vec::with_capacity(slots.len() + 1);
            for slot in slots {
                if !slot.overlaps(block) {
                    next.push(slot);
                    continue;
                }
                if slot.start < block.start {
                    next.push(MinuteRange::new(slot.start, block.start));
                }
                if block.end < slot.end {
                    next.push(MinuteRange::new(block.end, slot.end));
                }
            }
            slots = next;
        }
        free.extend(slots);
    }

    free.sort();
    free
}
