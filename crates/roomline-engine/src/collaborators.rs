//! Boundary contracts consumed by the engine: pricing, payment status, and
//! the audit/notification sink.
//!
//! The engine reads payment state and reports lifecycle events through these
//! traits but never implements payment capture, email delivery, or audit
//! storage itself. In-memory implementations are provided for tests and the
//! CLI.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Booking, BookingId, Room};

/// A payment created by the engine itself, only ever at check-in when the
/// caller supplies an in-person payment instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub booking: BookingId,
    pub amount_cents: i64,
    pub recorded_at: DateTime<Utc>,
    /// Capture method, e.g. "in-person".
    pub method: String,
}

/// Computes the cost of a reservation.
pub trait Pricing {
    fn price_for(&self, room: &Room, duration_minutes: i64) -> i64;
}

/// Default pricing: hourly rate × duration, pro-rated to the minute.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateCardPricing;

impl Pricing for RateCardPricing {
    fn price_for(&self, room: &Room, duration_minutes: i64) -> i64 {
        room.hourly_rate_cents * duration_minutes / 60
    }
}

/// Read access to payment state, plus the single write the lifecycle is
/// allowed: recording an in-person payment at check-in.
pub trait Payments {
    fn amount_owed(&self, booking: &Booking) -> i64;

    fn is_fully_paid(&self, booking: &Booking) -> bool {
        self.amount_owed(booking) <= 0
    }

    fn record_payment(&self, record: &PaymentRecord);
}

/// Payment ledger backed by a map; suitable for tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryPayments {
    paid: Mutex<HashMap<BookingId, i64>>,
}

impl InMemoryPayments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an externally captured payment against a booking.
    pub fn apply(&self, booking: BookingId, amount_cents: i64) {
        if let Ok(mut paid) = self.paid.lock() {
            *paid.entry(booking).or_insert(0) += amount_cents;
        }
    }

    pub fn paid_total(&self, booking: BookingId) -> i64 {
        self.paid
            .lock()
            .ok()
            .and_then(|paid| paid.get(&booking).copied())
            .unwrap_or(0)
    }
}

impl Payments for InMemoryPayments {
    fn amount_owed(&self, booking: &Booking) -> i64 {
        (booking.price_cents - self.paid_total(booking.id)).max(0)
    }

    fn record_payment(&self, record: &PaymentRecord) {
        self.apply(record.booking, record.amount_cents);
    }
}

/// Fire-and-forget audit/notification sink.
///
/// Implementations must not fail in a way that matters to the engine: a
/// transition that already committed is never rolled back because the sink
/// misbehaved, which is why `record` returns nothing.
pub trait AuditSink {
    fn record(&self, event: &str, booking: &Booking, actor: &str, payload: serde_json::Value);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &str, _booking: &Booking, _actor: &str, _payload: serde_json::Value) {}
}

/// Sink that retains events in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEntry>>,
}

/// One recorded audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub event: String,
    pub booking: BookingId,
    pub actor: String,
    pub payload: serde_json::Value,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &str, booking: &Booking, actor: &str, payload: serde_json::Value) {
        if let Ok(mut events) = self.events.lock() {
            events.push(AuditEntry {
                event: event.to_string(),
                booking: booking.id,
                actor: actor.to_string(),
                payload,
            });
        }
    }
}
