//! Feasibility and placement of one action into a partial schedule.
//!
//! Candidate starts lie on a fixed grid (seconds from session start) and
//! every placed duration is a whole number of grid steps, so the ends of
//! placed instances are grid points too and visibility can be read from
//! a [`VisibilityMap`].
//!
//! # Rules
//!
//! | Type | Bounds | Visibility | Extra |
//! |------|--------|------------|-------|
//! | Script | session | start and end | |
//! | Quick | session | start and end | cadence to every other instance of the action |
//! | Time_Seq | window | start and end | |
//! | Dark / Flat | session | none | |
//!
//! All types require the slot to be free of other instances. The first
//! feasible grid start at or after `search_from` wins.

use log::warn;

use crate::models::{
    align_down, align_up, ActionCatalog, ActionId, ActionType, CandidateSchedule,
    ObservingAction, Session, TimeWindow,
};
use crate::sky::{HorizonTable, TargetLocator, VisibilityMap};

/// An action converted to grid seconds, ready for placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedAction {
    pub id: ActionId,
    pub action_type: ActionType,
    pub priority: f64,
    /// Placed duration (s), a whole number of grid steps.
    pub duration: i64,
    /// Minimum spacing between instances (s). Quick only.
    pub cadence: Option<i64>,
    /// Interval the instance must lie in. `None` if the action can never
    /// be placed (window collapsed by grid alignment, unknown target).
    pub bounds: Option<TimeWindow>,
    /// Time_Seq window in session seconds, before clipping and alignment.
    pub window: Option<TimeWindow>,
    /// Visibility map row. `None` for untargeted actions.
    pub target: Option<usize>,
}

impl PreparedAction {
    /// Converts an action to session-relative grid seconds.
    pub fn new(
        action: &ObservingAction,
        session: &Session,
        grid_seconds: i64,
        visibility: &VisibilityMap,
    ) -> Self {
        let grid = grid_seconds.max(1);
        let horizon_end = align_down(session.duration_seconds(), grid);
        let mut duration = align_up((action.duration_seconds.round() as i64).max(1), grid);

        let mut bounds = if horizon_end > 0 {
            Some(TimeWindow::new(0, horizon_end))
        } else {
            None
        };
        let window = action.window_jd.map(|(start_jd, end_jd)| {
            TimeWindow::new(session.offset_of(start_jd), session.offset_of(end_jd))
        });
        if let Some((start_jd, end_jd)) = action.window_jd {
            let start = session.offset_of(start_jd).max(0);
            let end = session.offset_of(end_jd).min(horizon_end);
            let raw_len = session.offset_of(end_jd) - session.offset_of(start_jd);
            bounds = if end > start {
                TimeWindow::new(start, end).aligned_inward(grid)
            } else {
                None
            };
            // A sequence spanning its whole window fills whatever of the
            // window is left on the grid.
            if let Some(window) = bounds {
                if (action.duration_seconds - raw_len as f64).abs() < 1.0 {
                    duration = window.duration();
                }
            }
        }

        let target = match action.target.as_deref() {
            Some(name) if action.action_type.has_target() => {
                let idx = visibility.target_index(name);
                if idx.is_none() {
                    warn!("action {}: target {name} has no visibility data", action.id);
                    bounds = None;
                }
                idx
            }
            _ => None,
        };

        let cadence = match action.action_type {
            ActionType::Quick => action
                .cadence_seconds
                .map(|c| (c.ceil() as i64).max(1)),
            _ => None,
        };

        Self {
            id: action.id,
            action_type: action.action_type,
            priority: action.priority,
            duration,
            cadence,
            bounds,
            window,
            target,
        }
    }
}

/// Places actions on the grid of one session.
#[derive(Debug, Clone)]
pub struct Placer {
    grid_seconds: i64,
    visibility: VisibilityMap,
}

impl Placer {
    pub fn new(grid_seconds: i64, visibility: VisibilityMap) -> Self {
        Self {
            grid_seconds: grid_seconds.max(1),
            visibility,
        }
    }

    /// Builds a placer for a catalog, precomputing visibility of every
    /// catalog target.
    pub fn for_session(
        session: &Session,
        grid_seconds: i64,
        catalog: &ActionCatalog,
        locator: &dyn TargetLocator,
        horizon: &HorizonTable,
    ) -> Self {
        let targets = catalog.targets();
        let visibility = VisibilityMap::compute(
            session,
            grid_seconds,
            targets.iter().copied(),
            locator,
            horizon,
        );
        Self::new(grid_seconds, visibility)
    }

    pub fn grid_seconds(&self) -> i64 {
        self.grid_seconds
    }

    pub fn visibility(&self) -> &VisibilityMap {
        &self.visibility
    }

    /// Earliest feasible start at or after `search_from`, or `None`.
    ///
    /// Pure: the caller commits the placement.
    pub fn try_place(
        &self,
        action: &PreparedAction,
        schedule: &CandidateSchedule,
        search_from: i64,
    ) -> Option<i64> {
        let bounds = action.bounds?;
        if action.duration > bounds.duration() {
            return None;
        }
        let grid = self.grid_seconds;
        let latest = bounds.end - action.duration;
        let mut t = align_up(search_from.max(bounds.start), grid);

        while t <= latest {
            let slot = TimeWindow::starting_at(t, action.duration);
            if let Some(block) = schedule.first_overlap(&slot) {
                t = align_up(block.end(), grid);
                continue;
            }
            if let Some(cadence) = action.cadence {
                if let Some(near) = schedule
                    .instances_of(action.id)
                    .find(|i| (i.start - t).abs() < cadence)
                {
                    t = align_up(near.start + cadence, grid);
                    continue;
                }
            }
            if let Some(idx) = action.target {
                if !self.visibility.is_visible(idx, t)
                    || !self.visibility.is_visible(idx, slot.end)
                {
                    t += grid;
                    continue;
                }
            }
            return Some(t);
        }
        None
    }
}
