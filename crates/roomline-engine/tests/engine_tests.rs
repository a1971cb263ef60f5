//! End-to-end tests for the booking engine boundary: creation, validation
//! order, conflict handling at commit time, and lifecycle wiring.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use roomline_engine::collaborators::{InMemoryPayments, RecordingAuditSink};
use roomline_engine::engine::{BookingEngine, BookingRequest};
use roomline_engine::error::{BookingError, PolicyViolationReason};
use roomline_engine::lifecycle::TransitionData;
use roomline_engine::model::{BookingState, Room, RoomId, UserId};
use roomline_engine::policy::{BookingPolicy, DayHours, PolicyCatalog};
use roomline_engine::store::{BookingStore, MemoryStore};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn t(h: u32, m: u32) -> chrono::NaiveTime {
    chrono::NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, d, h, m, 0).unwrap()
}

fn policy() -> BookingPolicy {
    BookingPolicy {
        hours: DayHours {
            open: t(9, 0),
            close: t(22, 0),
        },
        weekday_hours: Default::default(),
        min_duration_minutes: 60,
        max_duration_minutes: 240,
        duration_step_minutes: 30,
        min_notice_minutes: 120,
        max_advance_days: 30,
        cancellation_notice_hours: 24,
        max_bookings_per_user_per_week: 2,
        confirmation_window_days: 3,
        checkin_window_minutes: 15,
        no_show_grace_minutes: 30,
    }
}

struct Harness {
    engine: BookingEngine<MemoryStore>,
    payments: Arc<InMemoryPayments>,
    audit: Arc<RecordingAuditSink>,
}

fn harness() -> Harness {
    let room = Room {
        id: RoomId::new("studio-a"),
        name: "Studio A".to_string(),
        category: "studio".to_string(),
        hourly_rate_cents: 2000,
        capacity: 8,
        timezone: Tz::UTC,
    };
    let mut catalog = PolicyCatalog::default();
    catalog
        .category_defaults
        .insert("studio".to_string(), policy());

    let payments = Arc::new(InMemoryPayments::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let engine = BookingEngine::new(vec![room], catalog, MemoryStore::new())
        .with_payments(payments.clone())
        .with_audit(audit.clone());
    Harness {
        engine,
        payments,
        audit,
    }
}

fn request(d: u32, h: u32, minutes: i64) -> BookingRequest {
    BookingRequest {
        room: RoomId::new("studio-a"),
        user: UserId::new("ada"),
        start: at(d, h, 0),
        duration_minutes: minutes,
        notes: None,
    }
}

/// "Now" used by most tests: Monday 2026-09-14, 08:00 UTC.
fn now() -> DateTime<Utc> {
    at(14, 8, 0)
}

fn violation_of(err: BookingError) -> PolicyViolationReason {
    match err {
        BookingError::PolicyViolation { reason } => reason,
        other => panic!("expected PolicyViolation, got {other}"),
    }
}

// ── Creation ────────────────────────────────────────────────────────────────

#[test]
fn create_booking_prices_and_schedules() {
    let h = harness();
    let booking = h.engine.create_booking(&request(14, 11, 90), now()).unwrap();

    assert_eq!(booking.state, BookingState::Scheduled);
    assert_eq!(booking.end, at(14, 12, 30));
    // 1.5h at 20.00/h
    assert_eq!(booking.price_cents, 3000);
    assert_eq!(booking.confirmation_deadline, Some(booking.start));

    let events = h.audit.entries();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "booking.created");
    assert_eq!(events[0].actor, "ada");
}

#[test]
fn overlapping_request_is_rejected_at_commit_time() {
    let h = harness();
    h.engine.create_booking(&request(14, 10, 120), now()).unwrap();

    // 10:00–11:00 overlaps the 10:00–12:00 booking.
    let mut second = request(14, 10, 60);
    second.user = UserId::new("grace");
    let err = h.engine.create_booking(&second, now()).unwrap_err();
    assert!(matches!(err, BookingError::RoomNotAvailable));
}

#[test]
fn touching_bookings_are_both_accepted() {
    let h = harness();
    h.engine.create_booking(&request(14, 10, 120), now()).unwrap();
    let mut second = request(14, 12, 60);
    second.user = UserId::new("grace");
    h.engine.create_booking(&second, now()).unwrap();
}

#[test]
fn cancelling_frees_the_slot_for_rebooking() {
    let h = harness();
    let first = h.engine.create_booking(&request(14, 10, 120), now()).unwrap();

    let mut second = request(14, 10, 120);
    second.user = UserId::new("grace");
    assert!(matches!(
        h.engine.create_booking(&second, now()),
        Err(BookingError::RoomNotAvailable)
    ));

    h.engine
        .transition(
            first.id,
            BookingState::Cancelled,
            TransitionData::default(),
            "ada",
            now(),
        )
        .unwrap();

    // No residual trace: the identical interval is bookable again.
    let rebooked = h.engine.create_booking(&second, now()).unwrap();
    assert_eq!(rebooked.start, first.start);
    assert_eq!(rebooked.end, first.end);
}

// ── Policy validation ───────────────────────────────────────────────────────

#[test]
fn off_grid_duration_is_rejected() {
    let h = harness();
    let err = h.engine.create_booking(&request(14, 10, 45), now()).unwrap_err();
    assert_eq!(violation_of(err), PolicyViolationReason::DurationNotOnGrid);
}

#[test]
fn duration_bounds_are_enforced() {
    let h = harness();
    let err = h.engine.create_booking(&request(14, 10, 30), now()).unwrap_err();
    assert_eq!(violation_of(err), PolicyViolationReason::DurationBelowMinimum);

    let err = h.engine.create_booking(&request(14, 10, 300), now()).unwrap_err();
    assert_eq!(violation_of(err), PolicyViolationReason::DurationAboveMaximum);
}

#[test]
fn interval_must_fit_operating_hours() {
    let h = harness();
    // 21:00 + 2h passes the 22:00 close.
    let err = h.engine.create_booking(&request(14, 21, 120), now()).unwrap_err();
    assert_eq!(violation_of(err), PolicyViolationReason::OutsideOperatingHours);

    // 08:00 start is before opening.
    let err = h.engine.create_booking(&request(15, 8, 60), now()).unwrap_err();
    assert_eq!(violation_of(err), PolicyViolationReason::OutsideOperatingHours);
}

#[test]
fn advance_notice_is_enforced() {
    let h = harness();
    // Start 09:00, now 08:00: one hour of notice, policy wants two.
    let err = h.engine.create_booking(&request(14, 9, 60), now()).unwrap_err();
    assert_eq!(violation_of(err), PolicyViolationReason::InsufficientNotice);
}

#[test]
fn booking_horizon_is_enforced() {
    let h = harness();
    // 2026-10-15 is 31 days past now, horizon is 30.
    let start = Utc.with_ymd_and_hms(2026, 10, 15, 10, 0, 0).unwrap();
    let req = BookingRequest {
        room: RoomId::new("studio-a"),
        user: UserId::new("ada"),
        start,
        duration_minutes: 60,
        notes: None,
    };
    let err = h.engine.create_booking(&req, now()).unwrap_err();
    assert_eq!(violation_of(err), PolicyViolationReason::BeyondBookingHorizon);
}

#[test]
fn weekly_cap_counts_only_non_cancelled_bookings() {
    let h = harness();
    // Cap is 2 per ISO week. Monday the 14th and Tuesday the 15th fill it.
    h.engine.create_booking(&request(14, 10, 60), now()).unwrap();
    h.engine.create_booking(&request(15, 10, 60), now()).unwrap();

    let err = h.engine.create_booking(&request(16, 10, 60), now()).unwrap_err();
    assert_eq!(violation_of(err), PolicyViolationReason::WeeklyLimitReached);

    // The following ISO week is unaffected.
    h.engine.create_booking(&request(21, 10, 60), now()).unwrap();

    // Cancelling one frees headroom in the capped week.
    let bookings = h
        .engine
        .store()
        .for_user_starting_in(&UserId::new("ada"), at(14, 0, 0), at(20, 0, 0))
        .unwrap();
    h.engine
        .transition(
            bookings[0].id,
            BookingState::Cancelled,
            TransitionData::default(),
            "ada",
            now(),
        )
        .unwrap();
    h.engine.create_booking(&request(16, 10, 60), now()).unwrap();
}

// ── Availability queries ────────────────────────────────────────────────────

#[test]
fn free_slots_reflect_existing_bookings() {
    let h = harness();
    h.engine.create_booking(&request(14, 10, 120), now()).unwrap();

    let date = NaiveDate::from_ymd_opt(2026, 9, 14).unwrap();
    let slots = h
        .engine
        .free_slots(&RoomId::new("studio-a"), date, None)
        .unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!((slots[0].start, slots[0].end), (at(14, 9, 0), at(14, 10, 0)));
    assert_eq!((slots[1].start, slots[1].end), (at(14, 12, 0), at(14, 22, 0)));
}

#[test]
fn available_durations_at_a_free_start() {
    let h = harness();
    h.engine.create_booking(&request(14, 13, 120), now()).unwrap();

    // 11:00 sits in the 09:00–13:00 gap: 1h, 1.5h, 2h fit.
    let options = h
        .engine
        .available_durations(&RoomId::new("studio-a"), at(14, 11, 0), None)
        .unwrap();
    let minutes: Vec<i64> = options.keys().copied().collect();
    assert_eq!(minutes, vec![60, 90, 120]);
}

#[test]
fn available_durations_inside_a_booking_is_empty() {
    let h = harness();
    h.engine.create_booking(&request(14, 13, 120), now()).unwrap();
    let options = h
        .engine
        .available_durations(&RoomId::new("studio-a"), at(14, 13, 30), None)
        .unwrap();
    assert!(options.is_empty());
}

#[test]
fn unknown_room_is_reported() {
    let h = harness();
    let date = NaiveDate::from_ymd_opt(2026, 9, 14).unwrap();
    let err = h.engine.free_slots(&RoomId::new("vault"), date, None).unwrap_err();
    assert!(matches!(err, BookingError::UnknownRoom(_)));
}

// ── Lifecycle wiring ────────────────────────────────────────────────────────

#[test]
fn checkin_with_in_person_payment_settles_the_balance() {
    let h = harness();
    let booking = h.engine.create_booking(&request(14, 11, 60), now()).unwrap();
    h.engine
        .transition(
            booking.id,
            BookingState::Confirmed,
            TransitionData::default(),
            "ada",
            at(14, 9, 0),
        )
        .unwrap();

    // Nothing captured yet; check-in without the instruction fails…
    let err = h
        .engine
        .transition(
            booking.id,
            BookingState::CheckedIn,
            TransitionData::default(),
            "front-desk",
            at(14, 11, 0),
        )
        .unwrap_err();
    assert!(matches!(err, BookingError::TransitionNotAllowed { .. }));

    // …and with it succeeds, creating a payment for the full owed amount.
    let checked_in = h
        .engine
        .transition(
            booking.id,
            BookingState::CheckedIn,
            TransitionData {
                pay_in_person: true,
                ..TransitionData::default()
            },
            "front-desk",
            at(14, 11, 0),
        )
        .unwrap();
    assert_eq!(checked_in.state, BookingState::CheckedIn);
    assert_eq!(h.payments.paid_total(booking.id), booking.price_cents);
}

#[test]
fn transitions_are_audited_with_old_and_new_state() {
    let h = harness();
    let booking = h.engine.create_booking(&request(14, 11, 60), now()).unwrap();
    h.engine
        .transition(
            booking.id,
            BookingState::Cancelled,
            TransitionData::default(),
            "ada",
            now(),
        )
        .unwrap();

    let events = h.audit.entries();
    let transition = events.last().unwrap();
    assert_eq!(transition.event, "booking.transitioned");
    assert_eq!(transition.payload["from"], "scheduled");
    assert_eq!(transition.payload["to"], "cancelled");
}

#[test]
fn failed_transition_leaves_stored_booking_unchanged() {
    let h = harness();
    let booking = h.engine.create_booking(&request(14, 11, 60), now()).unwrap();

    // Confirmation window (3 days) is open at `now`, but check-in from
    // Scheduled is never legal.
    let err = h
        .engine
        .transition(
            booking.id,
            BookingState::CheckedIn,
            TransitionData::default(),
            "ada",
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, BookingError::TransitionNotAllowed { .. }));

    let stored = h.engine.store().get(booking.id).unwrap();
    assert_eq!(stored.state, BookingState::Scheduled);
    assert_eq!(stored.version, booking.version);
}

#[test]
fn stale_version_update_is_rejected_by_the_store() {
    let h = harness();
    let booking = h.engine.create_booking(&request(14, 11, 60), now()).unwrap();

    let mut copy = booking.clone();
    copy.state = BookingState::Confirmed;
    h.engine.store().update_if_version(copy.clone(), booking.version).unwrap();

    // A second writer holding the old version loses.
    let err = h
        .engine
        .store()
        .update_if_version(copy, booking.version)
        .unwrap_err();
    assert!(matches!(err, BookingError::StaleBooking));
}
