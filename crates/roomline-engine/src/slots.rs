//! Free-slot computation: the gaps between opening time, existing bookings,
//! and closing time.
//!
//! Bookings are clipped to the operating window, sorted, merged, then walked
//! once to emit the gaps — O(n) in the number of bookings that day. Results
//! are recomputed per call; nothing here caches iterator state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::localtime;
use crate::model::{Booking, Room};
use crate::policy::BookingPolicy;

/// A maximal contiguous free interval within a room's operating hours.
///
/// Derived, never persisted; lifetime is one availability query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Merge occupied intervals, clipped to `[window_start, window_end)`.
///
/// Cancelled bookings are dropped before merging. Returns a sorted,
/// non-overlapping list of `(start, end)` pairs.
fn merge_occupied(
    bookings: &[Booking],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> = bookings
        .iter()
        .filter(|b| b.occupies_slot())
        .filter(|b| b.start < window_end && b.end > window_start)
        .map(|b| (b.start.max(window_start), b.end.min(window_end)))
        .collect();

    if intervals.is_empty() {
        return Vec::new();
    }

    // Stores return bookings pre-sorted by start, but a defensive sort keeps
    // the walk correct for any caller-supplied slice.
    intervals.sort_by_key(|&(start, end)| (start, end));

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }

    merged
}

/// Compute the free slots within an absolute window, given the bookings that
/// may overlap it.
///
/// Emits a gap before the first booking, between each adjacent pair, and
/// after the last; a single window-spanning gap when there are no bookings.
/// Zero-length gaps are dropped.
pub fn free_slots_in_window(
    bookings: &[Booking],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<TimeSlot> {
    let occupied = merge_occupied(bookings, window_start, window_end);

    let mut slots = Vec::new();
    let mut cursor = window_start;

    for (busy_start, busy_end) in &occupied {
        if cursor < *busy_start {
            slots.push(TimeSlot {
                start: cursor,
                end: *busy_start,
                duration_minutes: (*busy_start - cursor).num_minutes(),
            });
        }
        cursor = cursor.max(*busy_end);
    }

    // Trailing gap up to closing time.
    if cursor < window_end {
        slots.push(TimeSlot {
            start: cursor,
            end: window_end,
            duration_minutes: (window_end - cursor).num_minutes(),
        });
    }

    slots
}

/// Compute the free slots for `room` on `date` under `policy`.
///
/// The operating window is resolved in the room's timezone (overnight hours
/// roll the closing time into the next calendar day); the returned slots are
/// absolute instants.
pub fn free_slots(
    room: &Room,
    date: NaiveDate,
    policy: &BookingPolicy,
    bookings: &[Booking],
) -> Vec<TimeSlot> {
    let (open, close) = localtime::operating_window(room.timezone, date, policy);
    free_slots_in_window(bookings, open, close)
}
