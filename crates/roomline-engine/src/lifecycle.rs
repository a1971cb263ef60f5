//! The booking lifecycle state machine.
//!
//! One closed transition table, evaluated centrally in [`apply`] — every
//! edge, guard, and mutation of the lifecycle is auditable in this file.
//! Guard evaluation and mutation are all-or-nothing: [`apply`] works on an
//! owned copy and either returns the fully transitioned booking or an error
//! with the original untouched. Persistence, audit reporting, and payment
//! recording are the caller's job (see [`crate::engine`]).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::collaborators::{PaymentRecord, Payments};
use crate::error::{BookingError, GuardFailure, Result};
use crate::model::{Booking, BookingState};
use crate::policy::BookingPolicy;

/// Caller-supplied payload accompanying a transition request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionData {
    /// Reason recorded when cancelling.
    pub cancellation_reason: Option<String>,
    /// Notes recorded when marking a no-show.
    pub no_show_notes: Option<String>,
    /// In-person payment instruction for check-in: settle the owed amount at
    /// the door instead of requiring prior capture.
    pub pay_in_person: bool,
    /// Administrative override for early completion.
    pub admin_override: bool,
}

/// Everything a guard may consult. `now` is always injected — the state
/// machine never reads the wall clock.
pub struct TransitionContext<'a> {
    pub now: DateTime<Utc>,
    pub actor: String,
    pub policy: &'a BookingPolicy,
    pub payments: &'a dyn Payments,
    pub data: TransitionData,
}

/// Result of a successful transition: the updated booking plus any payment
/// record the caller must write.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub booking: Booking,
    pub payment: Option<PaymentRecord>,
}

/// The legal outgoing edges from a state. Terminal states return an empty
/// slice.
pub fn allowed_targets(state: BookingState) -> &'static [BookingState] {
    use BookingState::*;
    match state {
        Scheduled => &[Confirmed, Cancelled],
        Confirmed => &[CheckedIn, Cancelled, NoShow],
        CheckedIn => &[Completed],
        Completed | Cancelled | NoShow => &[],
    }
}

fn rejected(booking: &Booking, target: BookingState, guard: GuardFailure) -> BookingError {
    BookingError::TransitionNotAllowed {
        from: booking.state,
        to: target,
        guard,
    }
}

/// Attempt to move `booking` to `target` under `ctx`.
///
/// # Errors
/// Returns [`BookingError::TransitionNotAllowed`] naming the failed guard;
/// the input booking is left unchanged.
pub fn apply(
    booking: &Booking,
    target: BookingState,
    ctx: &TransitionContext<'_>,
) -> Result<TransitionOutcome> {
    use BookingState::*;

    if booking.state.is_terminal() {
        return Err(rejected(booking, target, GuardFailure::TerminalState));
    }
    if !allowed_targets(booking.state).contains(&target) {
        return Err(rejected(booking, target, GuardFailure::WrongState));
    }

    let mut next = booking.clone();
    next.state = target;
    let mut payment = None;

    match (booking.state, target) {
        (Scheduled, Confirmed) => {
            let window_opens =
                booking.start - Duration::days(ctx.policy.confirmation_window_days);
            if ctx.now < window_opens {
                return Err(rejected(booking, target, GuardFailure::ConfirmationTooEarly));
            }
            if ctx.now >= booking.start {
                return Err(rejected(booking, target, GuardFailure::ConfirmationTooLate));
            }
            next.confirmed_at = Some(ctx.now);
        }

        (Scheduled, Cancelled) | (Confirmed, Cancelled) => {
            next.cancelled_at = Some(ctx.now);
            next.cancellation_reason = Some(
                ctx.data
                    .cancellation_reason
                    .clone()
                    .unwrap_or_else(|| "cancelled".to_string()),
            );
        }

        (Confirmed, CheckedIn) => {
            let window = Duration::minutes(ctx.policy.checkin_window_minutes);
            if ctx.now < booking.start - window || ctx.now > booking.start + window {
                return Err(rejected(booking, target, GuardFailure::OutsideCheckInWindow));
            }
            if !ctx.payments.is_fully_paid(booking) {
                if !ctx.data.pay_in_person {
                    return Err(rejected(booking, target, GuardFailure::PaymentOutstanding));
                }
                payment = Some(PaymentRecord {
                    booking: booking.id,
                    amount_cents: ctx.payments.amount_owed(booking),
                    recorded_at: ctx.now,
                    method: "in-person".to_string(),
                });
            }
            next.checked_in_at = Some(ctx.now);
        }

        (Confirmed, NoShow) => {
            let grace_end =
                booking.start + Duration::minutes(ctx.policy.no_show_grace_minutes);
            if ctx.now < grace_end.min(booking.end) {
                return Err(rejected(booking, target, GuardFailure::NoShowTooEarly));
            }
            next.no_show_notes = ctx.data.no_show_notes.clone();
        }

        (CheckedIn, Completed) => {
            if ctx.now < booking.end && !ctx.data.admin_override {
                return Err(rejected(booking, target, GuardFailure::BeforeScheduledEnd));
            }
            next.checked_out_at = Some(ctx.now);
        }

        // Unreachable: allowed_targets already filtered every other pair.
        _ => return Err(rejected(booking, target, GuardFailure::WrongState)),
    }

    Ok(TransitionOutcome {
        booking: next,
        payment,
    })
}
