//! # roomline-engine
//!
//! Policy-driven reservation core for a finite set of physical rooms: is a
//! proposed interval legal and free, which start times and durations are
//! bookable, and how does a booking move through its guarded lifecycle
//! (scheduled → confirmed → checked-in → completed, with cancellation and
//! no-show branches).
//!
//! All slot and duration math is done in the room's own IANA timezone via
//! `chrono-tz`; instants crossing the API boundary are absolute UTC.
//!
//! ## Modules
//!
//! - [`policy`] — booking policies and the layered override resolver
//! - [`slots`] — free-slot computation within operating hours
//! - [`durations`] — legal durations for a candidate start time
//! - [`conflict`] — half-open interval overlap detection
//! - [`lifecycle`] — the guarded transition table
//! - [`engine`] — the exposed boundary wiring everything to a store
//! - [`store`] — persistence contract and in-memory reference store
//! - [`sweep`] — idempotent deadline/reminder batch planners
//! - [`collaborators`] — pricing, payments, and audit boundary traits
//! - [`localtime`] — timezone-qualified wall-clock arithmetic
//! - [`error`] — error taxonomy

pub mod collaborators;
pub mod conflict;
pub mod durations;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod localtime;
pub mod model;
pub mod policy;
pub mod slots;
pub mod store;
pub mod sweep;

pub use collaborators::{
    AuditSink, InMemoryPayments, NullAuditSink, PaymentRecord, Payments, Pricing,
    RateCardPricing, RecordingAuditSink,
};
pub use conflict::{find_conflicts, intervals_overlap, is_available, Conflict};
pub use durations::available_durations;
pub use engine::{BookingEngine, BookingRequest};
pub use error::{BookingError, GuardFailure, PolicyViolationReason, Result};
pub use lifecycle::{TransitionContext, TransitionData, TransitionOutcome};
pub use model::{Booking, BookingId, BookingState, Room, RoomId, UserId};
pub use policy::{BookingPolicy, DayHours, PolicyCatalog, PolicyOverride, GRID_MINUTES};
pub use slots::{free_slots, free_slots_in_window, TimeSlot};
pub use store::{BookingStore, MemoryStore};
pub use sweep::{Reminder, SweepCommand, SweepKind, SweepLedger};
