//! Execution-duration estimates.
//!
//! Fixed-length actions (Quick, Dark, Flat) take configured durations.
//! A Script takes the execution time of its target's last observation
//! when the history has a usable one, otherwise a prediction from the
//! target's observing plan.
//!
//! # Collaborators
//!
//! | Trait | Question | Bundled implementation |
//! |-------|----------|------------------------|
//! | [`HistoryLookup`] | when was the target last observed, and for how long? | [`HistoryTable`] |
//! | [`DurationPredictor`] | how long would a fresh run take? | [`PlanningPredictor`] |

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::{
    ActionType, ObservingAction, DARK_DURATION_SECONDS, FLAT_DURATION_SECONDS,
    QUICK_DURATION_SECONDS,
};

/// Fallback Script duration when nothing is known about the target (s).
pub const DEFAULT_SCRIPT_SECONDS: f64 = 600.0;

// ======================== History ========================

/// Most recent observation of a target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// When the observation ran (Julian Date).
    pub last_observed_jd: Option<f64>,
    /// How long it took (s).
    pub last_execution_seconds: Option<f64>,
}

/// History lookup collaborator. Absence is not an error.
pub trait HistoryLookup: Send + Sync {
    fn last_observation(&self, target: &str) -> Option<ObservationRecord>;
}

/// In-memory history keyed by target name.
#[derive(Debug, Clone, Default)]
pub struct HistoryTable {
    records: HashMap<String, ObservationRecord>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the record of a target.
    pub fn with_record(mut self, target: impl Into<String>, record: ObservationRecord) -> Self {
        self.records.insert(target.into(), record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl HistoryLookup for HistoryTable {
    fn last_observation(&self, target: &str) -> Option<ObservationRecord> {
        self.records.get(target).copied()
    }
}

// ======================== Prediction ========================

/// Script duration predictor collaborator.
pub trait DurationPredictor: Send + Sync {
    /// Predicted execution time (s), or `None` if the target is unknown.
    fn predict(&self, target: &str) -> Option<f64>;
}

/// Observing plan of one target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetPlan {
    /// Planned run length (minutes). Takes precedence when set.
    #[serde(default)]
    pub planning_minutes: Option<f64>,
    /// Finder (acquisition) exposure (s).
    #[serde(default)]
    pub finder_exposure_seconds: f64,
    /// Number of science exposures.
    #[serde(default)]
    pub exposures: u32,
    /// Science exposure length (s).
    #[serde(default)]
    pub exposure_seconds: f64,
}

/// Per-exposure readout and download overhead (s).
const EXPOSURE_OVERHEAD_SECONDS: f64 = 15.0;
/// Slew and settle overhead per run (s).
const SLEW_OVERHEAD_SECONDS: f64 = 30.0;

impl TargetPlan {
    /// Expected run length (s).
    ///
    /// `planning_minutes` wins when set; otherwise one slew, two finder
    /// exposures and the science exposures, each with readout overhead.
    pub fn expected_seconds(&self) -> f64 {
        if let Some(minutes) = self.planning_minutes.filter(|m| *m > 0.0) {
            return minutes * 60.0;
        }
        SLEW_OVERHEAD_SECONDS
            + 2.0 * (EXPOSURE_OVERHEAD_SECONDS + self.finder_exposure_seconds)
            + self.exposures as f64 * (EXPOSURE_OVERHEAD_SECONDS + self.exposure_seconds)
    }
}

/// Predicts Script durations from per-target observing plans.
#[derive(Debug, Clone, Default)]
pub struct PlanningPredictor {
    plans: HashMap<String, TargetPlan>,
}

impl PlanningPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the plan of a target.
    pub fn with_plan(mut self, target: impl Into<String>, plan: TargetPlan) -> Self {
        self.plans.insert(target.into(), plan);
        self
    }
}

impl DurationPredictor for PlanningPredictor {
    fn predict(&self, target: &str) -> Option<f64> {
        self.plans.get(target).map(TargetPlan::expected_seconds)
    }
}

// ======================== Duration model ========================

/// Duration assignment for parsed actions.
///
/// # Example
/// ```
/// use sky_schedule::duration::{DurationModel, HistoryTable, ObservationRecord};
/// use sky_schedule::models::ObservingAction;
///
/// let history = HistoryTable::new().with_record(
///     "RZ-Cas",
///     ObservationRecord {
///         last_observed_jd: Some(2_459_990.6),
///         last_execution_seconds: Some(1500.0),
///     },
/// );
/// let model = DurationModel::default().with_history(history);
/// let script = model.resolve(ObservingAction::script(1, 2.0, "RZ-Cas", 0.0));
/// assert_eq!(script.duration_seconds, 1500.0);
/// ```
pub struct DurationModel {
    /// Quick duration (s).
    pub quick_seconds: f64,
    /// Dark duration (s).
    pub dark_seconds: f64,
    /// Flat duration (s).
    pub flat_seconds: f64,
    /// Time_Seq duration override (s). `None` = whole window.
    pub time_seq_seconds: Option<f64>,
    /// Script duration when neither history nor prediction is available (s).
    pub default_script_seconds: f64,
    history: Box<dyn HistoryLookup>,
    predictor: Box<dyn DurationPredictor>,
}

impl Default for DurationModel {
    fn default() -> Self {
        Self {
            quick_seconds: QUICK_DURATION_SECONDS,
            dark_seconds: DARK_DURATION_SECONDS,
            flat_seconds: FLAT_DURATION_SECONDS,
            time_seq_seconds: None,
            default_script_seconds: DEFAULT_SCRIPT_SECONDS,
            history: Box::new(HistoryTable::new()),
            predictor: Box::new(PlanningPredictor::new()),
        }
    }
}

impl DurationModel {
    /// Sets the history collaborator.
    pub fn with_history(mut self, history: impl HistoryLookup + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    /// Sets the Script duration predictor.
    pub fn with_predictor(mut self, predictor: impl DurationPredictor + 'static) -> Self {
        self.predictor = Box::new(predictor);
        self
    }

    /// Attaches history and assigns the duration estimate of `action`.
    pub fn resolve(&self, mut action: ObservingAction) -> ObservingAction {
        let record = action
            .target
            .as_deref()
            .and_then(|t| self.history.last_observation(t));
        if let Some(record) = record {
            action.last_observed_jd = record.last_observed_jd;
            action.last_execution_seconds = record.last_execution_seconds;
        }

        action.duration_seconds = match action.action_type {
            ActionType::Quick => self.quick_seconds,
            ActionType::Dark => self.dark_seconds,
            ActionType::Flat => self.flat_seconds,
            ActionType::TimeSeq => self
                .time_seq_seconds
                .or_else(|| action.window_seconds())
                .unwrap_or(action.duration_seconds),
            ActionType::Script => self.script_seconds(&action),
        };
        action
    }

    fn script_seconds(&self, action: &ObservingAction) -> f64 {
        if let Some(last) = action
            .last_execution_seconds
            .filter(|s| s.is_normal() && *s > 0.0)
        {
            return last;
        }
        let predicted = action
            .target
            .as_deref()
            .and_then(|t| self.predictor.predict(t))
            .filter(|s| s.is_normal() && *s > 0.0);
        match predicted {
            Some(seconds) => seconds,
            None => {
                debug!(
                    "no history or plan for script {} ({}), using {}s",
                    action.id,
                    action.label(),
                    self.default_script_seconds
                );
                self.default_script_seconds
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_formula() {
        let plan = TargetPlan {
            planning_minutes: None,
            finder_exposure_seconds: 10.0,
            exposures: 20,
            exposure_seconds: 60.0,
        };
        // 30 + 2 * (15 + 10) + 20 * (15 + 60)
        assert_eq!(plan.expected_seconds(), 1580.0);
    }

    #[test]
    fn test_plan_minutes_take_precedence() {
        let plan = TargetPlan {
            planning_minutes: Some(25.0),
            finder_exposure_seconds: 10.0,
            exposures: 20,
            exposure_seconds: 60.0,
        };
        assert_eq!(plan.expected_seconds(), 1500.0);
    }

    #[test]
    fn test_script_uses_history_first() {
        let model = DurationModel::default()
            .with_history(HistoryTable::new().with_record(
                "M31",
                ObservationRecord {
                    last_observed_jd: Some(2_459_999.7),
                    last_execution_seconds: Some(900.0),
                },
            ))
            .with_predictor(PlanningPredictor::new().with_plan(
                "M31",
                TargetPlan {
                    planning_minutes: Some(40.0),
                    ..TargetPlan::default()
                },
            ));

        let script = model.resolve(ObservingAction::script(1, 1.0, "M31", 0.0));
        assert_eq!(script.duration_seconds, 900.0);
        assert_eq!(script.last_observed_jd, Some(2_459_999.7));
    }

    #[test]
    fn test_script_ignores_unusable_history() {
        let model = DurationModel::default()
            .with_history(HistoryTable::new().with_record(
                "M31",
                ObservationRecord {
                    last_observed_jd: Some(2_459_999.7),
                    last_execution_seconds: Some(0.0),
                },
            ))
            .with_predictor(PlanningPredictor::new().with_plan(
                "M31",
                TargetPlan {
                    planning_minutes: Some(40.0),
                    ..TargetPlan::default()
                },
            ));

        let script = model.resolve(ObservingAction::script(1, 1.0, "M31", 0.0));
        assert_eq!(script.duration_seconds, 2400.0);
    }

    #[test]
    fn test_script_fallback() {
        let model = DurationModel::default();
        let script = model.resolve(ObservingAction::script(1, 1.0, "Unknown", 0.0));
        assert_eq!(script.duration_seconds, DEFAULT_SCRIPT_SECONDS);
        assert!(script.last_observed_jd.is_none());
    }

    #[test]
    fn test_fixed_durations() {
        let model = DurationModel {
            quick_seconds: 120.0,
            ..DurationModel::default()
        };
        assert_eq!(
            model.resolve(ObservingAction::quick(1, 1.0, "M31", 600.0)).duration_seconds,
            120.0
        );
        assert_eq!(model.resolve(ObservingAction::dark(2, 1.0)).duration_seconds, 1800.0);
        assert_eq!(model.resolve(ObservingAction::flat(3, 1.0)).duration_seconds, 2400.0);
    }

    #[test]
    fn test_time_seq_duration() {
        let start = 2_460_000.5;
        let ts = ObservingAction::time_seq(1, 1.0, "V1", start, start + 1.0 / 24.0);

        let whole = DurationModel::default().resolve(ts.clone());
        // JD subtraction near 2.46e6 loses ~4e-5 s
        assert!((whole.duration_seconds - 3600.0).abs() < 1e-3);

        let fixed = DurationModel {
            time_seq_seconds: Some(900.0),
            ..DurationModel::default()
        }
        .resolve(ts);
        assert_eq!(fixed.duration_seconds, 900.0);
    }
}
