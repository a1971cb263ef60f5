//! Error types for roomline-engine operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{BookingId, BookingState, RoomId};

/// Why a proposed interval was rejected by policy validation.
///
/// A closed set, not free-text diagnostics. The `Display` text tells the
/// caller what to change, never which internal check tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyViolationReason {
    /// Duration is not a multiple of the policy's booking grid.
    DurationNotOnGrid,
    /// Duration is below the policy minimum.
    DurationBelowMinimum,
    /// Duration exceeds the policy maximum.
    DurationAboveMaximum,
    /// The interval falls (partly) outside the room's operating hours.
    OutsideOperatingHours,
    /// The start is too close to now for the policy's advance notice.
    InsufficientNotice,
    /// The start is further ahead than the policy's booking horizon.
    BeyondBookingHorizon,
    /// The user already holds the maximum number of bookings that week.
    WeeklyLimitReached,
}

impl std::fmt::Display for PolicyViolationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::DurationNotOnGrid => "choose a duration on the half-hour grid",
            Self::DurationBelowMinimum => "choose a longer duration",
            Self::DurationAboveMaximum => "choose a shorter duration",
            Self::OutsideOperatingHours => "choose a time within the room's opening hours",
            Self::InsufficientNotice => "choose a start time further in the future",
            Self::BeyondBookingHorizon => "choose a start time closer to today",
            Self::WeeklyLimitReached => "wait until next week or cancel an existing booking",
        };
        f.write_str(msg)
    }
}

/// Which lifecycle guard rejected a transition.
///
/// Like [`PolicyViolationReason`], the `Display` text names a corrective
/// action rather than the guard itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardFailure {
    /// No edge exists between the two states.
    WrongState,
    /// The originating state is terminal.
    TerminalState,
    /// Confirmation attempted before the confirmation window opens.
    ConfirmationTooEarly,
    /// Confirmation attempted at or after the scheduled start.
    ConfirmationTooLate,
    /// Check-in attempted outside the window around the scheduled start.
    OutsideCheckInWindow,
    /// Check-in attempted with a balance due and no in-person payment.
    PaymentOutstanding,
    /// No-show attempted before the grace period has elapsed.
    NoShowTooEarly,
    /// Completion attempted before the scheduled end without an override.
    BeforeScheduledEnd,
}

impl std::fmt::Display for GuardFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::WrongState => "this change is not possible from the booking's current state",
            Self::TerminalState => "the booking is closed and can no longer change",
            Self::ConfirmationTooEarly => "wait until the confirmation window opens",
            Self::ConfirmationTooLate => "the booking has already started and can no longer be confirmed",
            Self::OutsideCheckInWindow => "check in closer to the scheduled start time",
            Self::PaymentOutstanding => "settle the outstanding balance or pay in person at check-in",
            Self::NoShowTooEarly => "wait for the grace period to elapse before marking a no-show",
            Self::BeforeScheduledEnd => "wait until the scheduled end time to complete the booking",
        };
        f.write_str(msg)
    }
}

/// Errors surfaced by the reservation engine.
#[derive(Error, Debug)]
pub enum BookingError {
    /// The proposed interval violates the resolved booking policy.
    #[error("booking rejected: {reason}")]
    PolicyViolation { reason: PolicyViolationReason },

    /// A conflict was detected at commit time (including lost races).
    #[error("the room is no longer free at that time; refresh availability and choose a different time")]
    RoomNotAvailable,

    /// A lifecycle guard rejected the transition. The booking is unchanged.
    #[error("cannot move booking from {from} to {to}: {guard}")]
    TransitionNotAllowed {
        from: BookingState,
        to: BookingState,
        guard: GuardFailure,
    },

    /// No default policy exists for the room's category. Configuration
    /// defect, not user-actionable.
    #[error("no booking policy is configured for category '{category}'")]
    PolicyNotFound { category: String },

    /// The booking was modified concurrently; the caller should reload and
    /// re-evaluate.
    #[error("the booking changed while this request was in flight; reload and try again")]
    StaleBooking,

    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),

    #[error("unknown booking: {0}")]
    UnknownBooking(BookingId),

    /// The resolved policy is internally inconsistent (e.g. min > max).
    #[error("invalid booking policy: {0}")]
    InvalidPolicy(String),

    /// Failure underneath the persistence layer. Fatal; propagated as-is.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Convenience alias used throughout roomline-engine.
pub type Result<T> = std::result::Result<T, BookingError>;
