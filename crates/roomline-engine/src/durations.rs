//! Legal booking durations for a candidate start time.
//!
//! Durations are enumerated on the policy's half-hour grid, capped by the
//! binding boundary: whichever comes first of the policy maximum and the end
//! of the free slot containing the start. Enumeration is monotonic — gaps
//! are contiguous and duration only grows, so the first violation stops the
//! walk. No combination search is ever needed.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::policy::BookingPolicy;
use crate::slots::TimeSlot;

/// Human label for a duration in minutes ("30 minutes", "1 hour", "1.5 hours").
pub fn duration_label(minutes: i64) -> String {
    if minutes < 60 {
        format!("{} minutes", minutes)
    } else if minutes == 60 {
        "1 hour".to_string()
    } else if minutes % 60 == 0 {
        format!("{} hours", minutes / 60)
    } else {
        format!("{}.5 hours", minutes / 60)
    }
}

/// Map each bookable duration (minutes, ascending) at `start` to its label.
///
/// `slots` must be the free slots for the operating window containing
/// `start` (see [`crate::slots::free_slots`]). An empty map means `start` is
/// inside an existing booking, outside operating hours, or too close to the
/// binding boundary to fit even the minimum duration — a legitimate "too
/// late to book" outcome, not an error.
pub fn available_durations(
    policy: &BookingPolicy,
    slots: &[TimeSlot],
    start: DateTime<Utc>,
) -> BTreeMap<i64, String> {
    let mut options = BTreeMap::new();

    let Some(gap) = slots.iter().find(|s| s.start <= start && start < s.end) else {
        return options;
    };

    let mut minutes = policy.min_duration_minutes;
    while minutes <= policy.max_duration_minutes
        && start + Duration::minutes(minutes) <= gap.end
    {
        options.insert(minutes, duration_label(minutes));
        minutes += policy.duration_step_minutes;
    }

    options
}
