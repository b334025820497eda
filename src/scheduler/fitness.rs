//! Schedule fitness and quality metrics (KPIs).
//!
//! # Fitness
//!
//! | Key | Definition | Better |
//! |-----|-----------|--------|
//! | value | Sum of priorities over scheduled instances | higher |
//! | idle_seconds | Session length minus busy time | lower (tie-break) |
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Busy time | Sum of instance durations |
//! | Utilization | Busy time / session length |
//! | Per-type counts | Instances by action type |
//! | Unscheduled | Catalog actions with no instance |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::models::{ActionCatalog, ActionId, ActionType, CandidateSchedule};

/// Fitness of a decoded schedule.
///
/// Ordered by `value`, then by less idle time. The `signature`
/// identifies the decoded schedule and takes no part in comparisons.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScheduleFitness {
    /// Sum of priorities of scheduled instances.
    pub value: f64,
    /// Unscheduled time in the session (s).
    pub idle_seconds: i64,
    /// Hash of the placed `(action, start)` pairs.
    pub signature: u64,
}

impl ScheduleFitness {
    /// Scores a schedule. Omitted actions contribute nothing.
    pub fn evaluate(
        schedule: &CandidateSchedule,
        session_seconds: i64,
        priority_of: impl Fn(ActionId) -> f64,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        let mut value = 0.0;
        for instance in schedule.instances() {
            value += priority_of(instance.action_id);
            (instance.action_id, instance.start).hash(&mut hasher);
        }
        Self {
            value,
            idle_seconds: (session_seconds - schedule.busy_seconds()).max(0),
            signature: hasher.finish(),
        }
    }
}

impl PartialEq for ScheduleFitness {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.idle_seconds == other.idle_seconds
    }
}

impl PartialOrd for ScheduleFitness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.value.partial_cmp(&other.value)? {
            Ordering::Equal => Some(other.idle_seconds.cmp(&self.idle_seconds)),
            ord => Some(ord),
        }
    }
}

impl fmt::Display for ScheduleFitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} (idle {}s)", self.value, self.idle_seconds)
    }
}

/// Schedule performance indicators.
///
/// All time values are in seconds.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleKpi {
    /// Number of scheduled instances.
    pub instance_count: usize,
    /// Total observing time.
    pub busy_seconds: i64,
    /// Session time left unused.
    pub idle_seconds: i64,
    /// Busy fraction of the session (0.0..1.0).
    pub utilization: f64,
    /// Instances per action type.
    pub by_type: BTreeMap<ActionType, usize>,
    /// Catalog actions that were not scheduled, in catalog order.
    pub unscheduled: Vec<ActionId>,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and the catalog it was built from.
    pub fn calculate(
        schedule: &CandidateSchedule,
        catalog: &ActionCatalog,
        session_seconds: i64,
    ) -> Self {
        let busy = schedule.busy_seconds();
        let mut by_type = BTreeMap::new();
        for instance in schedule.instances() {
            if let Some(action) = catalog.get(instance.action_id) {
                *by_type.entry(action.action_type).or_insert(0) += 1;
            }
        }
        let unscheduled = catalog
            .actions()
            .iter()
            .filter(|a| !schedule.contains_action(a.id))
            .map(|a| a.id)
            .collect();
        let utilization = if session_seconds > 0 {
            busy as f64 / session_seconds as f64
        } else {
            0.0
        };

        Self {
            instance_count: schedule.len(),
            busy_seconds: busy,
            idle_seconds: (session_seconds - busy).max(0),
            utilization,
            by_type,
            unscheduled,
        }
    }
}
