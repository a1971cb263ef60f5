//! Booking policies and the layered override resolver.
//!
//! A policy is resolved per room (and optionally per user) by an explicit
//! three-tier merge: category default → room override → user override.
//! Override records carry `Option` fields; absent fields fall through to the
//! lower-priority value. The merged result is a single immutable value
//! object — there are no implicit global defaults.

use std::collections::HashMap;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::model::{Room, RoomId, UserId};

/// Granularity of the booking duration grid, in minutes.
pub const GRID_MINUTES: i64 = 30;

/// Opening and closing wall-clock times for one day. No date component.
///
/// `close <= open` means the room operates overnight: closing occurs on the
/// following calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

/// The resolved set of temporal constraints applied to a room for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingPolicy {
    /// Base opening/closing hours, used for any weekday without an override.
    pub hours: DayHours,
    /// Per-weekday hours, Monday-first. `None` falls back to `hours`.
    #[serde(default)]
    pub weekday_hours: [Option<DayHours>; 7],
    pub min_duration_minutes: i64,
    pub max_duration_minutes: i64,
    /// Step between offered durations. Must be a multiple of [`GRID_MINUTES`].
    #[serde(default = "default_grid")]
    pub duration_step_minutes: i64,
    /// Minimum advance notice between "now" and a booking's start.
    pub min_notice_minutes: i64,
    /// Maximum number of days ahead a booking may start.
    pub max_advance_days: i64,
    /// Notice required for a penalty-free cancellation. Consumed by billing
    /// collaborators; the lifecycle itself never blocks a cancellation.
    pub cancellation_notice_hours: i64,
    pub max_bookings_per_user_per_week: u32,
    /// Days before start at which confirmation becomes possible.
    pub confirmation_window_days: i64,
    /// Check-in is legal within ± this many minutes of the scheduled start.
    pub checkin_window_minutes: i64,
    /// Minutes past start after which a no-show may be recorded.
    pub no_show_grace_minutes: i64,
}

fn default_grid() -> i64 {
    GRID_MINUTES
}

impl BookingPolicy {
    /// Effective hours for a given weekday.
    pub fn hours_for(&self, weekday: Weekday) -> DayHours {
        self.weekday_hours[weekday.num_days_from_monday() as usize].unwrap_or(self.hours)
    }

    /// Check internal consistency of a resolved policy.
    ///
    /// # Errors
    /// Returns [`BookingError::InvalidPolicy`] when the duration bounds are
    /// inverted, non-positive, or off the half-hour grid.
    pub fn validate(&self) -> Result<()> {
        if self.min_duration_minutes <= 0 {
            return Err(BookingError::InvalidPolicy(
                "minimum duration must be positive".into(),
            ));
        }
        if self.min_duration_minutes > self.max_duration_minutes {
            return Err(BookingError::InvalidPolicy(format!(
                "minimum duration ({} min) exceeds maximum ({} min)",
                self.min_duration_minutes, self.max_duration_minutes
            )));
        }
        if self.duration_step_minutes <= 0 || self.duration_step_minutes % GRID_MINUTES != 0 {
            return Err(BookingError::InvalidPolicy(format!(
                "duration step ({} min) must be a positive multiple of {} minutes",
                self.duration_step_minutes, GRID_MINUTES
            )));
        }
        if self.min_duration_minutes % GRID_MINUTES != 0
            || self.max_duration_minutes % GRID_MINUTES != 0
        {
            return Err(BookingError::InvalidPolicy(
                "duration bounds must lie on the half-hour grid".into(),
            ));
        }
        Ok(())
    }
}

/// Partial policy: every field optional. Absent fields fall through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverride {
    pub hours: Option<DayHours>,
    pub weekday_hours: Option<[Option<DayHours>; 7]>,
    pub min_duration_minutes: Option<i64>,
    pub max_duration_minutes: Option<i64>,
    pub duration_step_minutes: Option<i64>,
    pub min_notice_minutes: Option<i64>,
    pub max_advance_days: Option<i64>,
    pub cancellation_notice_hours: Option<i64>,
    pub max_bookings_per_user_per_week: Option<u32>,
    pub confirmation_window_days: Option<i64>,
    pub checkin_window_minutes: Option<i64>,
    pub no_show_grace_minutes: Option<i64>,
}

impl PolicyOverride {
    /// Layer this override on top of `base`, replacing only present fields.
    pub fn apply_to(&self, base: &BookingPolicy) -> BookingPolicy {
        BookingPolicy {
            hours: self.hours.unwrap_or(base.hours),
            weekday_hours: self.weekday_hours.unwrap_or(base.weekday_hours),
            min_duration_minutes: self.min_duration_minutes.unwrap_or(base.min_duration_minutes),
            max_duration_minutes: self.max_duration_minutes.unwrap_or(base.max_duration_minutes),
            duration_step_minutes: self
                .duration_step_minutes
                .unwrap_or(base.duration_step_minutes),
            min_notice_minutes: self.min_notice_minutes.unwrap_or(base.min_notice_minutes),
            max_advance_days: self.max_advance_days.unwrap_or(base.max_advance_days),
            cancellation_notice_hours: self
                .cancellation_notice_hours
                .unwrap_or(base.cancellation_notice_hours),
            max_bookings_per_user_per_week: self
                .max_bookings_per_user_per_week
                .unwrap_or(base.max_bookings_per_user_per_week),
            confirmation_window_days: self
                .confirmation_window_days
                .unwrap_or(base.confirmation_window_days),
            checkin_window_minutes: self
                .checkin_window_minutes
                .unwrap_or(base.checkin_window_minutes),
            no_show_grace_minutes: self
                .no_show_grace_minutes
                .unwrap_or(base.no_show_grace_minutes),
        }
    }
}

/// Key-value policy configuration: category defaults plus per-room and
/// per-(category, user) override records.
///
/// User overrides are keyed by the room's policy category and the user, so
/// one record applies to every room sharing that category. One record per
/// key — a rewritten record wholly replaces the previous one (last write
/// wins on conflicting fields).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyCatalog {
    pub category_defaults: HashMap<String, BookingPolicy>,
    #[serde(default)]
    pub room_overrides: HashMap<RoomId, PolicyOverride>,
    #[serde(default)]
    pub user_overrides: HashMap<String, HashMap<UserId, PolicyOverride>>,
}

impl PolicyCatalog {
    /// Resolve the effective policy for `room`, optionally specialized for
    /// `user`. Merges in ascending priority: category default → room
    /// override → user override.
    ///
    /// # Errors
    /// Returns [`BookingError::PolicyNotFound`] when no category default
    /// exists, and [`BookingError::InvalidPolicy`] when the merged result is
    /// inconsistent.
    pub fn resolve(&self, room: &Room, user: Option<&UserId>) -> Result<BookingPolicy> {
        let base = self
            .category_defaults
            .get(&room.category)
            .ok_or_else(|| BookingError::PolicyNotFound {
                category: room.category.clone(),
            })?;

        let mut policy = base.clone();
        if let Some(over) = self.room_overrides.get(&room.id) {
            policy = over.apply_to(&policy);
        }
        if let Some(user) = user {
            if let Some(over) = self
                .user_overrides
                .get(&room.category)
                .and_then(|per_user| per_user.get(user))
            {
                policy = over.apply_to(&policy);
            }
        }

        policy.validate()?;
        Ok(policy)
    }
}
