//! Time-overlap detection between a candidate interval and existing bookings.
//!
//! All intervals are half-open `[start, end)`: touching endpoints are NOT
//! conflicts. Cancelled bookings are excluded entirely — cancelling frees
//! the slot immediately and leaves no residual trace here.

use chrono::{DateTime, Utc};

use crate::model::{Booking, BookingId};

/// A detected overlap between a candidate interval and an existing booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub booking: BookingId,
    pub overlap_minutes: i64,
}

/// Two half-open intervals overlap iff `a1 < b2 && b1 < a2`.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Find every non-cancelled booking whose interval overlaps the candidate.
///
/// The overlap duration is `min(a.end, b.end) - max(a.start, b.start)`.
pub fn find_conflicts(
    bookings: &[Booking],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Conflict> {
    bookings
        .iter()
        .filter(|b| b.occupies_slot())
        .filter(|b| intervals_overlap(start, end, b.start, b.end))
        .map(|b| {
            let overlap_start = start.max(b.start);
            let overlap_end = end.min(b.end);
            Conflict {
                booking: b.id,
                overlap_minutes: (overlap_end - overlap_start).num_minutes(),
            }
        })
        .collect()
}

/// Whether the candidate interval is free of conflicts.
///
/// This predicate is re-evaluated at commit time inside the store's atomic
/// insert, even when the caller already consulted the slot calculator — the
/// read-to-write race window must be closed by the writer, not the reader.
pub fn is_available(bookings: &[Booking], start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    bookings
        .iter()
        .filter(|b| b.occupies_slot())
        .all(|b| !intervals_overlap(start, end, b.start, b.end))
}
