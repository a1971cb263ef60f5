//! The reservation engine: the exposed boundary of the system.
//!
//! Wires the policy resolver, slot calculator, duration generator, conflict
//! detector, and lifecycle state machine to a [`BookingStore`] and the
//! pricing/payment/audit collaborators. Every operation takes an injected
//! `now`; the engine never reads the wall clock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::collaborators::{AuditSink, InMemoryPayments, Payments, Pricing, RateCardPricing};
use crate::durations;
use crate::error::{BookingError, PolicyViolationReason, Result};
use crate::lifecycle::{self, TransitionContext, TransitionData};
use crate::localtime;
use crate::model::{Booking, BookingId, BookingState, Room, RoomId, UserId};
use crate::policy::{BookingPolicy, PolicyCatalog, GRID_MINUTES};
use crate::slots::{self, TimeSlot};
use crate::store::BookingStore;
use crate::sweep::{self, Reminder, SweepKind, SweepLedger};

/// Attempts at the read-apply-write loop before giving up on a contended
/// booking.
const MAX_TRANSITION_ATTEMPTS: u32 = 3;

/// A request to reserve a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub room: RoomId,
    pub user: UserId,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The reservation engine. Generic over the store so the same logic runs
/// against the in-memory store in tests and a transactional store in
/// production.
pub struct BookingEngine<S: BookingStore> {
    rooms: HashMap<RoomId, Room>,
    policies: PolicyCatalog,
    store: S,
    pricing: Arc<dyn Pricing + Send + Sync>,
    payments: Arc<dyn Payments + Send + Sync>,
    audit: Arc<dyn AuditSink + Send + Sync>,
}

impl<S: BookingStore> BookingEngine<S> {
    pub fn new(rooms: Vec<Room>, policies: PolicyCatalog, store: S) -> Self {
        Self {
            rooms: rooms.into_iter().map(|r| (r.id.clone(), r)).collect(),
            policies,
            store,
            pricing: Arc::new(RateCardPricing),
            payments: Arc::new(InMemoryPayments::new()),
            audit: Arc::new(crate::collaborators::NullAuditSink),
        }
    }

    pub fn with_pricing(mut self, pricing: Arc<dyn Pricing + Send + Sync>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn Payments + Send + Sync>) -> Self {
        self.payments = payments;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink + Send + Sync>) -> Self {
        self.audit = audit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn room(&self, id: &RoomId) -> Result<&Room> {
        self.rooms
            .get(id)
            .ok_or_else(|| BookingError::UnknownRoom(id.clone()))
    }

    /// Resolve the effective policy for a room and optional user.
    pub fn policy_for(&self, room: &Room, user: Option<&UserId>) -> Result<BookingPolicy> {
        self.policies.resolve(room, user)
    }

    /// Free slots for `room_id` on `date` (a calendar date in the room's
    /// timezone).
    pub fn free_slots(
        &self,
        room_id: &RoomId,
        date: NaiveDate,
        user: Option<&UserId>,
    ) -> Result<Vec<TimeSlot>> {
        let room = self.room(room_id)?;
        let policy = self.policy_for(room, user)?;
        let (open, close) = localtime::operating_window(room.timezone, date, &policy);
        let bookings = self.store.for_room_overlapping(room_id, open, close)?;
        Ok(slots::free_slots_in_window(&bookings, open, close))
    }

    /// Bookable durations at `start`, keyed by minutes, valued by label.
    ///
    /// Empty when `start` falls inside an existing booking or outside
    /// operating hours.
    pub fn available_durations(
        &self,
        room_id: &RoomId,
        start: DateTime<Utc>,
        user: Option<&UserId>,
    ) -> Result<BTreeMap<i64, String>> {
        let room = self.room(room_id)?;
        let policy = self.policy_for(room, user)?;
        let Some((open, close)) = window_containing(room, &policy, start) else {
            return Ok(BTreeMap::new());
        };
        let bookings = self.store.for_room_overlapping(room_id, open, close)?;
        let free = slots::free_slots_in_window(&bookings, open, close);
        Ok(durations::available_durations(&policy, &free, start))
    }

    /// Create a booking for the requested interval.
    ///
    /// Policy validation runs first; the conflict check is then re-run
    /// atomically by the store at insert time, so a request that loses the
    /// race against a concurrent writer fails with `RoomNotAvailable`.
    ///
    /// # Errors
    /// [`BookingError::PolicyViolation`] with the specific reason, or
    /// [`BookingError::RoomNotAvailable`] on conflict.
    pub fn create_booking(&self, req: &BookingRequest, now: DateTime<Utc>) -> Result<Booking> {
        let room = self.room(&req.room)?;
        let policy = self.policy_for(room, Some(&req.user))?;
        let end = req.start + Duration::minutes(req.duration_minutes);

        self.validate_request(room, &policy, req, end, now)?;

        let price_cents = self.pricing.price_for(room, req.duration_minutes);
        let booking = Booking {
            id: BookingId(0), // assigned by the store
            room: req.room.clone(),
            user: req.user.clone(),
            start: req.start,
            end,
            state: BookingState::Scheduled,
            price_cents,
            created_at: now,
            notes: req.notes.clone(),
            // Confirmation is never legal after start, so the deadline the
            // sweep enforces is the start instant itself.
            confirmation_deadline: Some(req.start),
            confirmed_at: None,
            checked_in_at: None,
            checked_out_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            no_show_notes: None,
            version: 0,
        };

        let stored = self.store.insert_if_free(booking)?;
        self.audit.record(
            "booking.created",
            &stored,
            req.user.0.as_str(),
            json!({ "price_cents": stored.price_cents }),
        );
        Ok(stored)
    }

    fn validate_request(
        &self,
        room: &Room,
        policy: &BookingPolicy,
        req: &BookingRequest,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let violation = |reason: PolicyViolationReason| BookingError::PolicyViolation { reason };

        if req.duration_minutes <= 0 || req.duration_minutes % GRID_MINUTES != 0 {
            return Err(violation(PolicyViolationReason::DurationNotOnGrid));
        }
        if req.duration_minutes < policy.min_duration_minutes {
            return Err(violation(PolicyViolationReason::DurationBelowMinimum));
        }
        if req.duration_minutes > policy.max_duration_minutes {
            return Err(violation(PolicyViolationReason::DurationAboveMaximum));
        }

        match window_containing(room, policy, req.start) {
            Some((_, close)) if end <= close => {}
            _ => return Err(violation(PolicyViolationReason::OutsideOperatingHours)),
        }

        if req.start - now < Duration::minutes(policy.min_notice_minutes) {
            return Err(violation(PolicyViolationReason::InsufficientNotice));
        }
        if req.start > now + Duration::days(policy.max_advance_days) {
            return Err(violation(PolicyViolationReason::BeyondBookingHorizon));
        }

        let (week_start, week_end) = localtime::iso_week_window(room.timezone, req.start);
        let held = self
            .store
            .for_user_starting_in(&req.user, week_start, week_end)?
            .iter()
            .filter(|b| b.occupies_slot())
            .count();
        if held >= policy.max_bookings_per_user_per_week as usize {
            return Err(violation(PolicyViolationReason::WeeklyLimitReached));
        }

        Ok(())
    }

    /// Drive a booking to `target`, re-resolving the policy and re-reading
    /// the booking under optimistic concurrency.
    ///
    /// On success the updated booking has been persisted, any in-person
    /// payment record written, and the audit sink notified. Audit failures
    /// never roll back the transition.
    ///
    /// # Errors
    /// [`BookingError::TransitionNotAllowed`] with the failed guard;
    /// [`BookingError::StaleBooking`] when the booking stayed contended for
    /// all retry attempts.
    pub fn transition(
        &self,
        id: BookingId,
        target: BookingState,
        data: TransitionData,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Booking> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let current = self.store.get(id)?;
            let room = self.room(&current.room)?;
            let policy = self.policy_for(room, Some(&current.user))?;

            let ctx = TransitionContext {
                now,
                actor: actor.to_string(),
                policy: &policy,
                payments: self.payments.as_ref(),
                data: data.clone(),
            };
            let outcome = lifecycle::apply(&current, target, &ctx)?;

            match self.store.update_if_version(outcome.booking, current.version) {
                Ok(saved) => {
                    if let Some(payment) = &outcome.payment {
                        self.payments.record_payment(payment);
                    }
                    self.audit.record(
                        "booking.transitioned",
                        &saved,
                        actor,
                        json!({
                            "from": current.state.as_str(),
                            "to": target.as_str(),
                            "data": &data,
                        }),
                    );
                    return Ok(saved);
                }
                Err(BookingError::StaleBooking) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(BookingError::StaleBooking)
    }

    /// Cancel scheduled bookings whose confirmation deadline has elapsed.
    ///
    /// Force-transitions go through the same [`Self::transition`] contract
    /// as interactive requests. Bookings that raced to a different state
    /// between planning and applying are skipped, which together with the
    /// ledger makes re-runs no-ops.
    pub fn run_confirmation_sweep(
        &self,
        now: DateTime<Utc>,
        ledger: &mut SweepLedger,
    ) -> Result<Vec<Booking>> {
        let due = self.store.scheduled_with_deadline_before(now)?;
        let mut cancelled = Vec::new();
        for cmd in sweep::plan_confirmation_sweep(now, &due) {
            if !ledger.mark(cmd.booking, SweepKind::ConfirmationDeadline, cmd.window) {
                continue;
            }
            match self.transition(cmd.booking, cmd.target, cmd.data, "deadline-sweep", now) {
                Ok(b) => cancelled.push(b),
                // Someone confirmed or cancelled concurrently; nothing to do.
                Err(BookingError::TransitionNotAllowed { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(cancelled)
    }

    /// Report reminders for confirmed bookings starting within `lead`.
    ///
    /// Dispatch itself belongs to the notification collaborator behind the
    /// audit sink; the ledger guarantees at most one reminder per booking
    /// and scheduled start.
    pub fn run_reminder_sweep(
        &self,
        now: DateTime<Utc>,
        lead: Duration,
        ledger: &mut SweepLedger,
    ) -> Result<Vec<Reminder>> {
        let upcoming = self.store.confirmed_starting_in(now, now + lead)?;
        let reminders = sweep::plan_reminder_sweep(now, lead, &upcoming, ledger);
        for reminder in &reminders {
            if let Ok(booking) = self.store.get(reminder.booking) {
                self.audit.record(
                    "booking.reminder",
                    &booking,
                    "reminder-sweep",
                    json!({ "start": reminder.start }),
                );
            }
        }
        Ok(reminders)
    }
}

/// The operating window that contains `start`, if any.
///
/// Checks the window for the local date of `start`, then the previous
/// date's window — with overnight hours, an early-morning instant belongs
/// to the previous day's window.
fn window_containing(
    room: &Room,
    policy: &BookingPolicy,
    start: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let date = localtime::local_date(room.timezone, start);
    let (open, close) = localtime::operating_window(room.timezone, date, policy);
    if open <= start && start < close {
        return Some((open, close));
    }
    let prev = date.pred_opt()?;
    let (open, close) = localtime::operating_window(room.timezone, prev, policy);
    if open <= start && start < close {
        return Some((open, close));
    }
    None
}
