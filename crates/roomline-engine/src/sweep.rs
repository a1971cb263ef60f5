//! Periodic batch jobs as pure planners.
//!
//! Each sweep is a function of an injected `now` and a booking snapshot —
//! no wall clock, no hidden globals — and takes effect only through the same
//! `transition` contract used by interactive requests. Idempotency is
//! tracked with a dedupe marker keyed by {booking, kind, window}: re-running
//! a sweep never re-triggers a side effect already recorded.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::lifecycle::TransitionData;
use crate::model::{Booking, BookingId, BookingState, UserId};

/// The kinds of sweep side effects tracked for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepKind {
    ConfirmationDeadline,
    Reminder,
}

/// Dedupe marker set for sweep side effects.
///
/// The window component is the instant that anchors the side effect (the
/// confirmation deadline, the booking start), so a rescheduled booking gets
/// a fresh marker while a re-run sweep does not.
#[derive(Debug, Default)]
pub struct SweepLedger {
    seen: HashSet<(BookingId, SweepKind, DateTime<Utc>)>,
}

impl SweepLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the marker; returns `true` when it was not already present
    /// (i.e. the side effect should fire).
    pub fn mark(&mut self, booking: BookingId, kind: SweepKind, window: DateTime<Utc>) -> bool {
        self.seen.insert((booking, kind, window))
    }
}

/// One force-transition planned by a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepCommand {
    pub booking: BookingId,
    pub target: BookingState,
    pub data: TransitionData,
    /// Anchor instant for the dedupe marker.
    pub window: DateTime<Utc>,
}

/// Plan cancellations for scheduled bookings whose confirmation deadline has
/// elapsed.
///
/// Pure: non-Scheduled bookings and bookings without an elapsed deadline
/// are skipped, so a second run over post-sweep state plans nothing.
pub fn plan_confirmation_sweep(now: DateTime<Utc>, bookings: &[Booking]) -> Vec<SweepCommand> {
    bookings
        .iter()
        .filter(|b| b.state == BookingState::Scheduled)
        .filter_map(|b| {
            let deadline = b.confirmation_deadline.filter(|d| *d <= now)?;
            Some(SweepCommand {
                booking: b.id,
                target: BookingState::Cancelled,
                data: TransitionData {
                    cancellation_reason: Some("confirmation deadline elapsed".to_string()),
                    ..TransitionData::default()
                },
                window: deadline,
            })
        })
        .collect()
}

/// A reminder to be dispatched by the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub booking: BookingId,
    pub user: UserId,
    pub start: DateTime<Utc>,
}

/// Plan reminders for confirmed bookings starting within `lead` of `now`.
///
/// The ledger deduplicates across runs: each booking is reminded at most
/// once per scheduled start.
pub fn plan_reminder_sweep(
    now: DateTime<Utc>,
    lead: Duration,
    bookings: &[Booking],
    ledger: &mut SweepLedger,
) -> Vec<Reminder> {
    bookings
        .iter()
        .filter(|b| b.state == BookingState::Confirmed)
        .filter(|b| b.start > now && b.start <= now + lead)
        .filter(|b| ledger.mark(b.id, SweepKind::Reminder, b.start))
        .map(|b| Reminder {
            booking: b.id,
            user: b.user.clone(),
            start: b.start,
        })
        .collect()
}
