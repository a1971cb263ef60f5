//! Booking persistence contract and the in-memory reference store.
//!
//! The store is where the no-overlap invariant is actually enforced:
//! [`BookingStore::insert_if_free`] re-runs the conflict predicate inside
//! the same atomic unit of work that inserts, so a request that loses the
//! read-to-write race fails with `RoomNotAvailable` instead of corrupting
//! state. Per-booking writes are serialized with a version counter.
//!
//! [`MemoryStore`] backs the tests and the CLI; database-backed stores
//! implement the same contract with a transaction plus row-level locking on
//! the room's booking set.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::conflict;
use crate::error::{BookingError, Result};
use crate::model::{Booking, BookingId, BookingState, RoomId, UserId};

/// Persistence contract for bookings.
pub trait BookingStore {
    /// Insert `booking` iff its interval overlaps no existing non-cancelled
    /// booking for the same room. Conflict check and insert are atomic.
    ///
    /// Assigns the booking's id and initial version.
    ///
    /// # Errors
    /// [`BookingError::RoomNotAvailable`] when the interval is taken,
    /// including when a concurrent writer won the slot first.
    fn insert_if_free(&self, booking: Booking) -> Result<Booking>;

    fn get(&self, id: BookingId) -> Result<Booking>;

    /// Replace a booking iff its stored version still equals
    /// `expected_version`; bumps the version on success.
    ///
    /// # Errors
    /// [`BookingError::StaleBooking`] when another writer got there first.
    fn update_if_version(&self, booking: Booking, expected_version: u64) -> Result<Booking>;

    /// All bookings for `room` overlapping `[from, to)`, any state, sorted
    /// by start time ascending.
    fn for_room_overlapping(
        &self,
        room: &RoomId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;

    /// All bookings by `user` starting within `[from, to)`, any state.
    fn for_user_starting_in(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;

    /// Scheduled bookings whose confirmation deadline is at or before
    /// `cutoff`. Feed for the confirmation-deadline sweep.
    fn scheduled_with_deadline_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;

    /// Confirmed bookings starting within `[from, to)`. Feed for the
    /// reminder sweep.
    fn confirmed_starting_in(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: u64,
    bookings: BTreeMap<BookingId, Booking>,
}

/// Mutex-backed store. The single lock makes conflict-check-then-insert
/// atomic, which is all the concurrency contract requires.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with pre-existing bookings (scenario files, tests).
    /// Ids and versions are assigned here; no conflict checking is done, so
    /// seed data is trusted to uphold the no-overlap invariant.
    pub fn seed(&self, bookings: Vec<Booking>) -> Result<Vec<Booking>> {
        let mut inner = self.lock()?;
        let mut seeded = Vec::with_capacity(bookings.len());
        for mut booking in bookings {
            inner.next_id += 1;
            booking.id = BookingId(inner.next_id);
            booking.version = 1;
            inner.bookings.insert(booking.id, booking.clone());
            seeded.push(booking);
        }
        Ok(seeded)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| BookingError::Storage("booking store lock poisoned".to_string()))
    }
}

impl BookingStore for MemoryStore {
    fn insert_if_free(&self, mut booking: Booking) -> Result<Booking> {
        let mut inner = self.lock()?;

        let same_room: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.room == booking.room)
            .cloned()
            .collect();
        if !conflict::is_available(&same_room, booking.start, booking.end) {
            return Err(BookingError::RoomNotAvailable);
        }

        inner.next_id += 1;
        booking.id = BookingId(inner.next_id);
        booking.version = 1;
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    fn get(&self, id: BookingId) -> Result<Booking> {
        self.lock()?
            .bookings
            .get(&id)
            .cloned()
            .ok_or(BookingError::UnknownBooking(id))
    }

    fn update_if_version(&self, mut booking: Booking, expected_version: u64) -> Result<Booking> {
        let mut inner = self.lock()?;
        let current = inner
            .bookings
            .get(&booking.id)
            .ok_or(BookingError::UnknownBooking(booking.id))?;
        if current.version != expected_version {
            return Err(BookingError::StaleBooking);
        }
        booking.version = expected_version + 1;
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    fn for_room_overlapping(
        &self,
        room: &RoomId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let inner = self.lock()?;
        let mut out: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| &b.room == room && b.start < to && b.end > from)
            .cloned()
            .collect();
        out.sort_by_key(|b| (b.start, b.end));
        Ok(out)
    }

    fn for_user_starting_in(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let inner = self.lock()?;
        let mut out: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| &b.user == user && b.start >= from && b.start < to)
            .cloned()
            .collect();
        out.sort_by_key(|b| (b.start, b.end));
        Ok(out)
    }

    fn scheduled_with_deadline_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let inner = self.lock()?;
        let mut out: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| {
                b.state == BookingState::Scheduled
                    && b.confirmation_deadline.is_some_and(|d| d <= cutoff)
            })
            .cloned()
            .collect();
        out.sort_by_key(|b| (b.start, b.id));
        Ok(out)
    }

    fn confirmed_starting_in(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let inner = self.lock()?;
        let mut out: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.state == BookingState::Confirmed && b.start >= from && b.start < to)
            .cloned()
            .collect();
        out.sort_by_key(|b| (b.start, b.id));
        Ok(out)
    }
}
