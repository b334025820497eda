//! Observing session model.
//!
//! A session is the night's scheduling boundary. Its absolute times are
//! Julian Dates, the representation used by the session files that feed
//! the scheduler. Inside the engine a time is the number of seconds since
//! [`Session::start_jd`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian Date of the Unix epoch (1970-01-01T00:00:00Z).
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// The bounded time window within which observations may run.
///
/// Immutable for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session start (Julian Date).
    pub start_jd: f64,
    /// Session stop (Julian Date).
    pub stop_jd: f64,
    /// Log destination named by the session header.
    pub log_path: PathBuf,
}

impl Session {
    /// Creates a session, rejecting non-finite times and `stop <= start`.
    pub fn new(start_jd: f64, stop_jd: f64, log_path: impl Into<PathBuf>) -> Result<Self> {
        if !start_jd.is_finite() || !stop_jd.is_finite() {
            return Err(SchedulerError::Header(format!(
                "session times must be finite (start {start_jd}, stop {stop_jd})"
            )));
        }
        if stop_jd <= start_jd {
            return Err(SchedulerError::Header(format!(
                "session stop {stop_jd} is not after start {start_jd}"
            )));
        }
        Ok(Self {
            start_jd,
            stop_jd,
            log_path: log_path.into(),
        })
    }

    /// Creates a session lasting `seconds` from `start_jd`.
    pub fn spanning(start_jd: f64, seconds: i64, log_path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(start_jd, start_jd + seconds as f64 / SECONDS_PER_DAY, log_path)
    }

    /// Session length (s), rounded to the nearest second.
    pub fn duration_seconds(&self) -> i64 {
        self.offset_of(self.stop_jd)
    }

    /// Seconds from session start to `jd`, rounded to the nearest second.
    pub fn offset_of(&self, jd: f64) -> i64 {
        ((jd - self.start_jd) * SECONDS_PER_DAY).round() as i64
    }

    /// Julian Date `offset` seconds after session start.
    pub fn jd_at(&self, offset: i64) -> f64 {
        self.start_jd + offset as f64 / SECONDS_PER_DAY
    }

    /// UTC time `offset` seconds after session start, for log output.
    pub fn utc_at(&self, offset: i64) -> Option<DateTime<Utc>> {
        jd_to_utc(self.jd_at(offset))
    }
}

/// Converts a Julian Date to UTC (millisecond resolution).
pub fn jd_to_utc(jd: f64) -> Option<DateTime<Utc>> {
    let millis = ((jd - UNIX_EPOCH_JD) * SECONDS_PER_DAY * 1000.0).round();
    if !millis.is_finite() {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
}
