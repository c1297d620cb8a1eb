// src/services/scheduling.rs
//! Interview slot overlap checks
//!
//! Slots are half-open intervals `[start, end)`: a slot that ends exactly when
//! another begins does not overlap it.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Longest interview slot accepted (8 hours)
pub const MAX_SLOT_MINUTES: i64 = 480;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("end time must be after start time")]
    EmptyRange,
    #[error("interview cannot be longer than 480 minutes")]
    TooLong,
    #[error("interview must start in the future")]
    InThePast,
    #[error("time slot overlaps interview {0}")]
    Conflict(String),
}

/// A non-empty half-open time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Fails with [`SchedulingError::EmptyRange`] when `end <= start`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SchedulingError> {
        if end <= start {
            return Err(SchedulingError::EmptyRange);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// An existing booking as loaded from storage
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: String,
    pub range: TimeRange,
    /// Terminal reservations (cancelled, completed, no-show) never block a slot
    pub terminal: bool,
}

/// First reservation that blocks `candidate`, skipping terminal ones and `exclude_id`
pub fn find_conflict<'a>(
    candidate: &TimeRange,
    existing: &'a [Reservation],
    exclude_id: Option<&str>,
) -> Option<&'a Reservation> {
    existing.iter().find(|reservation| {
        !reservation.terminal
            && exclude_id != Some(reservation.id.as_str())
            && candidate.overlaps(&reservation.range)
    })
}

pub fn has_conflict(
    candidate: &TimeRange,
    existing: &[Reservation],
    exclude_id: Option<&str>,
) -> bool {
    find_conflict(candidate, existing, exclude_id).is_some()
}

/// Checks the slot rules applied before any conflict lookup
pub fn validate_slot(range: &TimeRange, now: DateTime<Utc>) -> Result<(), SchedulingError> {
    if range.duration() > Duration::minutes(MAX_SLOT_MINUTES) {
        return Err(SchedulingError::TooLong);
    }
    if range.start() <= now {
        return Err(SchedulingError::InThePast);
    }
    Ok(())
}
