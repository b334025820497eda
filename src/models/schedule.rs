//! Candidate schedule (solution) model.
//!
//! A candidate schedule is an ordered set of non-overlapping scheduled
//! instances. Instances are kept sorted by start time; since they never
//! overlap, their end times are sorted too, which lets overlap queries
//! use binary search.

use serde::{Deserialize, Serialize};

use super::{ActionId, TimeWindow};

/// One placed observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInstance {
    /// Action being executed.
    pub action_id: ActionId,
    /// Start time (s from session start).
    pub start: i64,
    /// Assigned duration (s).
    pub duration: i64,
}

impl ScheduledInstance {
    /// Creates a new instance.
    pub fn new(action_id: ActionId, start: i64, duration: i64) -> Self {
        Self {
            action_id,
            start,
            duration,
        }
    }

    /// End time (s, exclusive).
    #[inline]
    pub fn end(&self) -> i64 {
        self.start + self.duration
    }

    /// Occupied interval.
    #[inline]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::starting_at(self.start, self.duration)
    }
}

/// A proposed assignment of actions to start times.
///
/// The unit the search engine builds, scores and discards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSchedule {
    instances: Vec<ScheduledInstance>,
}

impl CandidateSchedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an instance at its time-ordered position.
    ///
    /// The caller is responsible for checking feasibility first.
    pub fn insert(&mut self, instance: ScheduledInstance) {
        let pos = self.instances.partition_point(|s| s.start <= instance.start);
        self.instances.insert(pos, instance);
    }

    /// Instances in time order.
    pub fn instances(&self) -> &[ScheduledInstance] {
        &self.instances
    }

    /// Number of scheduled instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// First instance whose interval overlaps `window`, if any.
    pub fn first_overlap(&self, window: &TimeWindow) -> Option<&ScheduledInstance> {
        let idx = self.instances.partition_point(|s| s.end() <= window.start);
        self.instances
            .get(idx)
            .filter(|s| s.start < window.end)
    }

    /// Whether `window` is free of scheduled instances.
    pub fn is_free(&self, window: &TimeWindow) -> bool {
        self.first_overlap(window).is_none()
    }

    /// Instances of one action, in time order.
    pub fn instances_of(&self, action_id: ActionId) -> impl Iterator<Item = &ScheduledInstance> {
        self.instances
            .iter()
            .filter(move |s| s.action_id == action_id)
    }

    /// Whether the action has at least one instance.
    pub fn contains_action(&self, action_id: ActionId) -> bool {
        self.instances_of(action_id).next().is_some()
    }

    /// Total scheduled time (s).
    pub fn busy_seconds(&self) -> i64 {
        self.instances.iter().map(|s| s.duration).sum()
    }

    /// End of the last instance (s). Zero for an empty schedule.
    pub fn makespan(&self) -> i64 {
        self.instances.last().map(|s| s.end()).unwrap_or(0)
    }
}

/// A broken schedule invariant, reported by
/// [`audit_schedule`](crate::validation::audit_schedule).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Action the violating instance belongs to.
    pub action_id: ActionId,
    /// Human-readable description.
    pub message: String,
}

/// Classification of schedule invariant violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Instance starts before the session or ends after it.
    OutsideSession,
    /// Instance overlaps another instance.
    Overlap,
    /// Repeated instance closer than the action's cadence.
    CadenceTooShort,
    /// Time_Seq instance outside its window.
    OutsideWindow,
    /// Target below the horizon at start or end.
    NotVisible,
    /// Instance of an action that is not in the catalog, or a second
    /// instance of a single-shot action.
    UnknownOrRepeated,
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        violation_type: ViolationType,
        action_id: ActionId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            action_id,
            message: message.into(),
        }
    }
}
