// crates/outpass-core/src/core/time.rs
// ============================================================================
// Module: Outpass Time Model
// Description: Canonical timestamps, time-of-day values, and daily windows.
// Purpose: Provide deterministic, replayable time values for policy decisions.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Outpass decisions are functions of explicit time values supplied by
//! callers. The core never reads wall-clock time directly; hosts convert
//! their clock into a [`Timestamp`] at the boundary so every decision is
//! deterministic and unit-testable against fixed clocks.
//!
//! Civil conversion (date, time of day, weekday) uses UTC. Deployments pick
//! their institutional wall clock by running hosts in it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use time::Weekday;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Time conversion and construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// Time-of-day components are out of range.
    #[error("invalid time of day: {hour:02}:{minute:02}")]
    InvalidTimeOfDay {
        /// Hour component.
        hour: u8,
        /// Minute component.
        minute: u8,
    },
    /// Timestamp cannot be represented as a civil date/time.
    #[error("timestamp out of range: {0} ms")]
    OutOfRange(i64),
    /// Window bounds are degenerate (start equals end).
    #[error("empty time window")]
    EmptyWindow,
}

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// Milliseconds in one second.
const MILLIS_PER_SECOND: i64 = 1_000;
/// Milliseconds in one minute.
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
/// Milliseconds in one hour.
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;

/// Canonical timestamp: milliseconds since the unix epoch.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads
///   wall-clock time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp as unix epoch seconds (floor).
    #[must_use]
    pub const fn unix_seconds(self) -> i64 {
        self.0.div_euclid(MILLIS_PER_SECOND)
    }

    /// Returns this timestamp shifted forward by whole minutes (saturating).
    #[must_use]
    pub const fn plus_minutes(self, minutes: i64) -> Self {
        Self(self.0.saturating_add(minutes.saturating_mul(MILLIS_PER_MINUTE)))
    }

    /// Returns this timestamp shifted backward by whole minutes (saturating).
    #[must_use]
    pub const fn minus_minutes(self, minutes: i64) -> Self {
        Self(self.0.saturating_sub(minutes.saturating_mul(MILLIS_PER_MINUTE)))
    }

    /// Returns the span in milliseconds from `self` to `later`.
    #[must_use]
    pub const fn span_millis_until(self, later: Self) -> i64 {
        later.0.saturating_sub(self.0)
    }

    /// Converts a whole-hour count into milliseconds.
    #[must_use]
    pub const fn hours_as_millis(hours: u32) -> i64 {
        (hours as i64).saturating_mul(MILLIS_PER_HOUR)
    }

    /// Resolves the civil (UTC) date, time of day, and weekday.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] when the timestamp cannot be
    /// represented as a civil date/time.
    pub fn civil(self) -> Result<CivilTime, TimeError> {
        let moment = OffsetDateTime::from_unix_timestamp(self.unix_seconds())
            .map_err(|_| TimeError::OutOfRange(self.0))?;
        Ok(CivilTime {
            date: moment.date(),
            time_of_day: TimeOfDay {
                hour: moment.hour(),
                minute: moment.minute(),
            },
            weekday: moment.weekday(),
        })
    }
}

/// Civil projection of a [`Timestamp`]: date, time of day, and weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTime {
    /// Civil date.
    pub date: Date,
    /// Time-of-day component.
    pub time_of_day: TimeOfDay,
    /// Day of the week.
    pub weekday: Weekday,
}

// ============================================================================
// SECTION: Time of Day
// ============================================================================

/// Wall-clock time of day with minute precision.
///
/// # Invariants
/// - `hour < 24` and `minute < 60`; construct via [`TimeOfDay::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    /// Hour component (0-23).
    pub hour: u8,
    /// Minute component (0-59).
    pub minute: u8,
}

impl TimeOfDay {
    /// Creates a validated time-of-day value.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::InvalidTimeOfDay`] when components are out of
    /// range.
    pub const fn new(hour: u8, minute: u8) -> Result<Self, TimeError> {
        if hour >= 24 || minute >= 60 {
            return Err(TimeError::InvalidTimeOfDay {
                hour,
                minute,
            });
        }
        Ok(Self {
            hour,
            minute,
        })
    }

    /// Returns the minute index within the day (0-1439).
    #[must_use]
    pub const fn minute_of_day(self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    /// Validates the components of a deserialized value.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::InvalidTimeOfDay`] when components are out of
    /// range.
    pub const fn validate(self) -> Result<(), TimeError> {
        if self.hour >= 24 || self.minute >= 60 {
            return Err(TimeError::InvalidTimeOfDay {
                hour: self.hour,
                minute: self.minute,
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Daily Windows
// ============================================================================

/// Daily time window with inclusive start and exclusive end.
///
/// # Invariants
/// - `start != end`; windows where `end < start` wrap past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window start (inclusive).
    pub start: TimeOfDay,
    /// Window end (exclusive).
    pub end: TimeOfDay,
}

impl TimeWindow {
    /// Creates a validated daily window.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::EmptyWindow`] when start equals end, or
    /// [`TimeError::InvalidTimeOfDay`] for out-of-range bounds.
    pub const fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, TimeError> {
        if let Err(err) = start.validate() {
            return Err(err);
        }
        if let Err(err) = end.validate() {
            return Err(err);
        }
        if start.minute_of_day() == end.minute_of_day() {
            return Err(TimeError::EmptyWindow);
        }
        Ok(Self {
            start,
            end,
        })
    }

    /// Reports whether the given time of day falls inside the window.
    #[must_use]
    pub const fn contains(&self, at: TimeOfDay) -> bool {
        let t = at.minute_of_day();
        let start = self.start.minute_of_day();
        let end = self.end.minute_of_day();
        if start < end {
            start <= t && t < end
        } else {
            // Window wraps past midnight.
            t >= start || t < end
        }
    }

    /// Validates the bounds of a deserialized window.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError`] when either bound is out of range or the window
    /// is empty.
    pub const fn validate(&self) -> Result<(), TimeError> {
        if let Err(err) = self.start.validate() {
            return Err(err);
        }
        if let Err(err) = self.end.validate() {
            return Err(err);
        }
        if self.start.minute_of_day() == self.end.minute_of_day() {
            return Err(TimeError::EmptyWindow);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Day Classification
// ============================================================================

/// Classification of a civil date for policy resolution.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    /// Regular working day.
    Working,
    /// Declared holiday or weekly off day.
    Holiday,
}
