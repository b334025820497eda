//! Time window model.
//!
//! # Time Model
//! All times are whole seconds relative to the session start (t=0).
//! Conversion to and from Julian Dates happens at the I/O boundary
//! (see [`Session`](super::Session)).

use serde::{Deserialize, Serialize};

/// A time interval [start, end).
///
/// Half-open interval: includes start, excludes end. Two back-to-back
/// observations `[a, b)` and `[b, c)` do not overlap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    /// Interval start (s, inclusive).
    pub start: i64,
    /// Interval end (s, exclusive).
    pub end: i64,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Creates a window of `duration` seconds starting at `start`.
    pub fn starting_at(start: i64, duration: i64) -> Self {
        Self::new(start, start + duration)
    }

    /// Duration of this window (s).
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Whether a timestamp falls within this window.
    #[inline]
    pub fn contains(&self, time: i64) -> bool {
        time >= self.start && time < self.end
    }

    /// Whether `other` lies entirely inside this window.
    #[inline]
    pub fn encloses(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Shrinks the window inward so both ends fall on multiples of `grid`.
    ///
    /// Returns `None` if nothing of the window is left.
    pub fn aligned_inward(&self, grid: i64) -> Option<Self> {
        let start = align_up(self.start, grid);
        let end = align_down(self.end, grid);
        (end > start).then(|| Self::new(start, end))
    }
}

/// Rounds `t` up to the next multiple of `grid`.
#[inline]
pub fn align_up(t: i64, grid: i64) -> i64 {
    t.div_euclid(grid) * grid + if t.rem_euclid(grid) == 0 { 0 } else { grid }
}

/// Rounds `t` down to a multiple of `grid`.
#[inline]
pub fn align_down(t: i64, grid: i64) -> i64 {
    t.div_euclid(grid) * grid
}
