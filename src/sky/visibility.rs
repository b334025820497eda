//! Precomputed target visibility over the session grid.
//!
//! Placement asks "is this target above the horizon at t?" many
//! thousands of times per generation. Every start and end the engine
//! tests lies on the placement grid, so the answer is computed once per
//! target and grid point before search and looked up afterwards.

use std::collections::HashMap;

use log::{info, warn};
use rayon::prelude::*;

use super::{HorizonTable, TargetLocator};
use crate::models::{align_down, Session};

/// Visibility of each target at each grid point of a session.
#[derive(Debug, Clone, Default)]
pub struct VisibilityMap {
    grid_seconds: i64,
    index: HashMap<String, usize>,
    visible: Vec<Vec<bool>>,
}

impl VisibilityMap {
    /// Evaluates the horizon predicate for every target at every grid
    /// point `0, grid, 2*grid, ...` up to the session end.
    ///
    /// A target the locator does not know is never visible.
    pub fn compute<'a>(
        session: &Session,
        grid_seconds: i64,
        targets: impl IntoIterator<Item = &'a str>,
        locator: &dyn TargetLocator,
        horizon: &HorizonTable,
    ) -> Self {
        let grid_seconds = grid_seconds.max(1);
        let last = align_down(session.duration_seconds(), grid_seconds);
        let points = (last / grid_seconds + 1).max(0) as usize;

        let names: Vec<&str> = targets.into_iter().collect();
        let visible: Vec<Vec<bool>> = names
            .par_iter()
            .map(|&target| {
                (0..points)
                    .map(|k| {
                        let jd = session.jd_at(k as i64 * grid_seconds);
                        match locator.locate(target, jd) {
                            Some(pos) => horizon.is_visible(pos.altitude, pos.azimuth),
                            None => false,
                        }
                    })
                    .collect()
            })
            .collect();

        for (name, row) in names.iter().zip(&visible) {
            if !row.iter().any(|&v| v) {
                if locator.locate(name, session.start_jd).is_none() {
                    warn!("target {name} is unknown to the locator; never visible");
                } else {
                    warn!("target {name} never rises above the horizon this session");
                }
            }
        }
        info!(
            "visibility map: {} targets x {} grid points ({}s grid)",
            names.len(),
            points,
            grid_seconds
        );

        let index = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();
        Self {
            grid_seconds,
            index,
            visible,
        }
    }

    /// Index of a target, for [`is_visible`](Self::is_visible).
    pub fn target_index(&self, target: &str) -> Option<usize> {
        self.index.get(target).copied()
    }

    /// Whether target `idx` is visible at session offset `t` (s).
    ///
    /// Off-grid or out-of-session times are not visible.
    pub fn is_visible(&self, idx: usize, t: i64) -> bool {
        if t < 0 || t % self.grid_seconds != 0 {
            return false;
        }
        self.visible
            .get(idx)
            .and_then(|row| row.get((t / self.grid_seconds) as usize))
            .copied()
            .unwrap_or(false)
    }

    /// Fraction of grid points at which target `idx` is visible.
    pub fn visible_fraction(&self, idx: usize) -> f64 {
        match self.visible.get(idx) {
            Some(row) if !row.is_empty() => {
                row.iter().filter(|&&v| v).count() as f64 / row.len() as f64
            }
            _ => 0.0,
        }
    }

    pub fn target_count(&self) -> usize {
        self.visible.len()
    }

    pub fn grid_seconds(&self) -> i64 {
        self.grid_seconds
    }
}
