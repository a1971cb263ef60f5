//! Timezone-qualified wall-clock arithmetic.
//!
//! Every computation carries the room's timezone explicitly — rooms in
//! different zones can be queried concurrently in one process, so no ambient
//! timezone state is ever consulted. Wall-clock times resolve to absolute
//! instants here and nowhere else.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::policy::BookingPolicy;

/// Resolve a local wall-clock datetime in `tz` to an absolute instant.
///
/// Spring-forward gaps (e.g. 02:30 during a DST jump) shift forward to the
/// first valid wall-clock time after the gap; fall-back ambiguity resolves
/// to the earlier offset.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            // Inside a DST gap. Real-world gaps are at most two hours; probe
            // forward in half-hour steps until the wall clock is valid again.
            let mut probe = local;
            for _ in 0..8 {
                probe += Duration::minutes(30);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
            // Unreachable for real timezone data; treat the wall clock as UTC.
            Utc.from_utc_datetime(&local)
        }
    }
}

/// The absolute operating window `[open, close)` for `date` in the room's
/// timezone.
///
/// When the policy's closing time is at or before its opening time, the room
/// operates overnight and closing falls on the following calendar day.
pub fn operating_window(
    tz: Tz,
    date: NaiveDate,
    policy: &BookingPolicy,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let hours = policy.hours_for(date.weekday());
    let open = resolve_local(tz, date.and_time(hours.open));
    let close_date = if hours.close <= hours.open {
        date.succ_opt().unwrap_or(date)
    } else {
        date
    };
    let close = resolve_local(tz, close_date.and_time(hours.close));
    (open, close)
}

/// The local calendar date an instant falls on in `tz`.
pub fn local_date(tz: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// The absolute bounds of the ISO week (Monday 00:00 local, exclusive end
/// seven days later) containing `instant` in `tz`.
///
/// Used for the per-user weekly booking cap, which counts in the room's
/// local week, not the server's.
pub fn iso_week_window(tz: Tz, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let local = instant.with_timezone(&tz).date_naive();
    let monday = local - Duration::days(i64::from(local.weekday().num_days_from_monday()));
    let start = resolve_local(tz, monday.and_time(NaiveTime::MIN));
    let end = resolve_local(tz, (monday + Duration::days(7)).and_time(NaiveTime::MIN));
    (start, end)
}
