//! Local horizon obstruction map.
//!
//! The horizon is an ordered table of `(azimuth, minimum elevation)`
//! control points in degrees spanning −180°..+180°. Azimuth 0 is South,
//! ±180 is North, and angles increase clockwise (through West). Between
//! control points the minimum elevation is linearly interpolated.
//!
//! Tables are per-site data. They are loaded from configuration or a
//! plain text file, never compiled in.
//!
//! # Text format
//!
//! ```text
//! # azimuth  elevation
//! -180.0  0.0
//!  -97.0  3.0
//!  180.0  0.0
//! ```

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Above this altitude (deg) a target clears every obstruction.
pub const ALWAYS_VISIBLE_ALTITUDE_DEG: f64 = 45.0;
/// Below this altitude (deg) a target is never observed.
pub const NEVER_VISIBLE_ALTITUDE_DEG: f64 = 5.0;

/// One control point of the horizon table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonPoint {
    /// Azimuth (deg, 0 = South, increasing through West).
    pub azimuth_deg: f64,
    /// Minimum observable elevation at this azimuth (deg).
    pub elevation_deg: f64,
}

/// Piecewise-linear horizon obstruction map for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonTable {
    points: Vec<HorizonPoint>,
}

impl HorizonTable {
    /// Builds a table from `(azimuth, elevation)` pairs in degrees.
    ///
    /// The table must have at least two points, start at −180°, end at
    /// +180°, be non-decreasing in azimuth, contain only finite values and
    /// have equal elevations at the two (coincident) endpoints.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let points: Vec<HorizonPoint> = points
            .into_iter()
            .map(|(azimuth_deg, elevation_deg)| HorizonPoint {
                azimuth_deg,
                elevation_deg,
            })
            .collect();

        if points.len() < 2 {
            return Err(SchedulerError::Horizon(format!(
                "need at least 2 points, found {}",
                points.len()
            )));
        }
        if let Some(p) = points
            .iter()
            .find(|p| !p.azimuth_deg.is_finite() || !p.elevation_deg.is_finite())
        {
            return Err(SchedulerError::Horizon(format!(
                "non-finite point ({}, {})",
                p.azimuth_deg, p.elevation_deg
            )));
        }
        if let Some(pair) = points
            .windows(2)
            .find(|w| w[1].azimuth_deg < w[0].azimuth_deg)
        {
            return Err(SchedulerError::Horizon(format!(
                "azimuth decreases from {} to {}",
                pair[0].azimuth_deg, pair[1].azimuth_deg
            )));
        }

        let first = points[0];
        let last = points[points.len() - 1];
        if first.azimuth_deg != -180.0 || last.azimuth_deg != 180.0 {
            return Err(SchedulerError::Horizon(format!(
                "table must span -180..180, spans {}..{}",
                first.azimuth_deg, last.azimuth_deg
            )));
        }
        if first.elevation_deg != last.elevation_deg {
            return Err(SchedulerError::Horizon(format!(
                "elevation at -180 ({}) differs from elevation at 180 ({})",
                first.elevation_deg, last.elevation_deg
            )));
        }

        Ok(Self { points })
    }

    /// A horizon at constant elevation all the way round.
    pub fn flat(elevation_deg: f64) -> Self {
        Self {
            points: vec![
                HorizonPoint {
                    azimuth_deg: -180.0,
                    elevation_deg,
                },
                HorizonPoint {
                    azimuth_deg: 180.0,
                    elevation_deg,
                },
            ],
        }
    }

    /// Parses the plain text format: one `azimuth elevation` pair per
    /// line, blank lines and `#` comments ignored.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut points = Vec::new();
        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let parsed = match fields.as_slice() {
                [az, el] => az.parse::<f64>().ok().zip(el.parse::<f64>().ok()),
                _ => None,
            };
            match parsed {
                Some(point) => points.push(point),
                None => {
                    return Err(SchedulerError::Horizon(format!(
                        "line {}: expected 'azimuth elevation', found '{}'",
                        line_no + 1,
                        raw.trim()
                    )))
                }
            }
        }
        Self::new(points)
    }

    /// Loads a table from a text file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SchedulerError::Horizon(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_text(&text)
    }

    /// Control points in azimuth order.
    pub fn points(&self) -> &[HorizonPoint] {
        &self.points
    }

    /// Interpolated minimum elevation (deg) at `azimuth_deg`.
    ///
    /// Returns `None` when no bracketing pair exists (azimuth outside the
    /// table or NaN).
    pub fn limit_at(&self, azimuth_deg: f64) -> Option<f64> {
        let pts = &self.points;
        let last = pts.len() - 1;
        if !(azimuth_deg >= pts[0].azimuth_deg && azimuth_deg <= pts[last].azimuth_deg) {
            return None;
        }

        let upper = pts
            .partition_point(|p| p.azimuth_deg <= azimuth_deg)
            .clamp(1, last);
        let (a, b) = (pts[upper - 1], pts[upper]);
        let span = b.azimuth_deg - a.azimuth_deg;
        if span <= 0.0 {
            // vertical edge: take the higher side
            return Some(a.elevation_deg.max(b.elevation_deg));
        }
        let fraction = (azimuth_deg - a.azimuth_deg) / span;
        Some(a.elevation_deg + fraction * (b.elevation_deg - a.elevation_deg))
    }

    /// Whether a target at the given altitude/azimuth (radians) clears the
    /// local horizon.
    ///
    /// A failed table lookup is logged and treated as not visible.
    pub fn is_visible(&self, altitude_rad: f64, azimuth_rad: f64) -> bool {
        let altitude = altitude_rad.to_degrees();
        if altitude > ALWAYS_VISIBLE_ALTITUDE_DEG {
            return true;
        }
        if !(altitude >= NEVER_VISIBLE_ALTITUDE_DEG) {
            return false;
        }

        let azimuth = normalize_azimuth_deg(azimuth_rad.to_degrees());
        match self.limit_at(azimuth) {
            Some(limit) => altitude >= limit,
            None => {
                warn!("horizon lookup failure for azimuth {azimuth:.3} deg");
                false
            }
        }
    }
}

/// Wraps an azimuth in degrees into −180..=180.
fn normalize_azimuth_deg(azimuth: f64) -> f64 {
    if azimuth > 180.0 || azimuth < -180.0 {
        let wrapped = (azimuth + 180.0).rem_euclid(360.0) - 180.0;
        if wrapped == -180.0 && azimuth > 0.0 {
            180.0
        } else {
            wrapped
        }
    } else {
        azimuth
    }
}
