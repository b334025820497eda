//! Observing action model and the read-only action catalog.
//!
//! An observing action is one schedulable request. Its type decides
//! which timing fields matter:
//!
//! | Type | Target | Extra fields | Duration |
//! |------|--------|--------------|----------|
//! | Script | yes | - | history or prediction |
//! | Quick | yes | cadence | 300 s |
//! | Time_Seq | yes | window start/end | window length (overridable) |
//! | Dark | no | - | 1800 s |
//! | Flat | no | - | 2400 s |

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::session::SECONDS_PER_DAY;
use crate::validation::{validate_catalog, ValidationError};

/// Fixed execution time of a Quick check (s).
pub const QUICK_DURATION_SECONDS: f64 = 5.0 * 60.0;
/// Fixed execution time of a dark frame set (s).
pub const DARK_DURATION_SECONDS: f64 = 30.0 * 60.0;
/// Fixed execution time of a flat frame set (s).
pub const FLAT_DURATION_SECONDS: f64 = 40.0 * 60.0;

/// Unique, stable action identifier (from the input file).
pub type ActionId = i64;

/// Kind of observing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// One-shot scripted sequence.
    Script,
    /// Periodically repeating quick check.
    Quick,
    /// Fixed-interval time series.
    #[serde(rename = "Time_Seq")]
    TimeSeq,
    /// Dark calibration frames.
    Dark,
    /// Flat calibration frames.
    Flat,
}

impl ActionType {
    /// Token used in session and schedule files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Script => "Script",
            ActionType::Quick => "Quick",
            ActionType::TimeSeq => "Time_Seq",
            ActionType::Dark => "Dark",
            ActionType::Flat => "Flat",
        }
    }

    /// Number of whitespace-separated fields an input line of this type has.
    pub fn field_count(&self) -> usize {
        match self {
            ActionType::Dark | ActionType::Flat => 3,
            ActionType::Script => 4,
            ActionType::Quick => 5,
            ActionType::TimeSeq => 6,
        }
    }

    /// Whether the action points the telescope at a sky target.
    pub fn has_target(&self) -> bool {
        !matches!(self, ActionType::Dark | ActionType::Flat)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Script" => Ok(ActionType::Script),
            "Quick" => Ok(ActionType::Quick),
            "Time_Seq" | "TimeSeq" => Ok(ActionType::TimeSeq),
            "Dark" => Ok(ActionType::Dark),
            "Flat" => Ok(ActionType::Flat),
            other => Err(format!("unknown action type '{other}'")),
        }
    }
}

/// One schedulable observation request.
///
/// `priority` is a single opaque weight: the producer has already folded
/// the session weight into it and it cannot be split back apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservingAction {
    /// Unique identifier.
    pub id: ActionId,
    /// Action kind.
    pub action_type: ActionType,
    /// Priority weight (>= 0).
    pub priority: f64,
    /// Target name. `None` for Dark/Flat.
    pub target: Option<String>,
    /// Minimum spacing between instances (s). Quick only.
    pub cadence_seconds: Option<f64>,
    /// Allowed window as Julian Dates `(start, end)`. Time_Seq only.
    pub window_jd: Option<(f64, f64)>,
    /// Expected execution time (s).
    pub duration_seconds: f64,
    /// Time of the most recent observation of the target (Julian Date).
    pub last_observed_jd: Option<f64>,
    /// Execution time of that observation (s).
    pub last_execution_seconds: Option<f64>,
}

impl ObservingAction {
    fn base(id: ActionId, action_type: ActionType, priority: f64, duration_seconds: f64) -> Self {
        Self {
            id,
            action_type,
            priority,
            target: None,
            cadence_seconds: None,
            window_jd: None,
            duration_seconds,
            last_observed_jd: None,
            last_execution_seconds: None,
        }
    }

    /// Creates a Script action with a known duration estimate.
    pub fn script(
        id: ActionId,
        priority: f64,
        target: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::base(id, ActionType::Script, priority, duration_seconds)
        }
    }

    /// Creates a Quick action repeating no more often than `cadence_seconds`.
    pub fn quick(
        id: ActionId,
        priority: f64,
        target: impl Into<String>,
        cadence_seconds: f64,
    ) -> Self {
        Self {
            target: Some(target.into()),
            cadence_seconds: Some(cadence_seconds),
            ..Self::base(id, ActionType::Quick, priority, QUICK_DURATION_SECONDS)
        }
    }

    /// Creates a Time_Seq action confined to `[start_jd, end_jd]`.
    ///
    /// The duration defaults to the full window length.
    pub fn time_seq(
        id: ActionId,
        priority: f64,
        target: impl Into<String>,
        start_jd: f64,
        end_jd: f64,
    ) -> Self {
        Self {
            target: Some(target.into()),
            window_jd: Some((start_jd, end_jd)),
            ..Self::base(
                id,
                ActionType::TimeSeq,
                priority,
                (end_jd - start_jd) * SECONDS_PER_DAY,
            )
        }
    }

    /// Creates a Dark calibration action.
    pub fn dark(id: ActionId, priority: f64) -> Self {
        Self::base(id, ActionType::Dark, priority, DARK_DURATION_SECONDS)
    }

    /// Creates a Flat calibration action.
    pub fn flat(id: ActionId, priority: f64) -> Self {
        Self::base(id, ActionType::Flat, priority, FLAT_DURATION_SECONDS)
    }

    /// Overrides the duration estimate.
    pub fn with_duration(mut self, duration_seconds: f64) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }

    /// Records the most recent observation of the target.
    pub fn with_history(mut self, observed_jd: f64, execution_seconds: Option<f64>) -> Self {
        self.last_observed_jd = Some(observed_jd);
        self.last_execution_seconds = execution_seconds;
        self
    }

    /// Window length (s). `None` unless this is a Time_Seq action.
    pub fn window_seconds(&self) -> Option<f64> {
        self.window_jd
            .map(|(start, end)| (end - start) * SECONDS_PER_DAY)
    }

    /// Target name, or the type token for untargeted actions.
    pub fn label(&self) -> &str {
        self.target.as_deref().unwrap_or(self.action_type.as_str())
    }
}

/// Immutable set of schedulable actions.
///
/// Built once from parsed input and never mutated during a run.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: Vec<ObservingAction>,
    by_id: HashMap<ActionId, usize>,
}

impl ActionCatalog {
    /// Builds a catalog, checking every action invariant.
    pub fn new(actions: Vec<ObservingAction>) -> Result<Self, Vec<ValidationError>> {
        validate_catalog(&actions)?;
        let by_id = actions
            .iter()
            .enumerate()
            .map(|(idx, a)| (a.id, idx))
            .collect();
        Ok(Self { actions, by_id })
    }

    /// Looks up an action by id.
    pub fn get(&self, id: ActionId) -> Option<&ObservingAction> {
        self.by_id.get(&id).map(|&idx| &self.actions[idx])
    }

    /// All actions, in input order.
    pub fn actions(&self) -> &[ObservingAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Distinct target names, sorted.
    pub fn targets(&self) -> BTreeSet<&str> {
        self.actions
            .iter()
            .filter_map(|a| a.target.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tokens() {
        assert_eq!("Time_Seq".parse::<ActionType>(), Ok(ActionType::TimeSeq));
        assert_eq!("TimeSeq".parse::<ActionType>(), Ok(ActionType::TimeSeq));
        assert_eq!("Dark".parse::<ActionType>(), Ok(ActionType::Dark));
        assert!("Bias".parse::<ActionType>().is_err());
        assert_eq!(ActionType::TimeSeq.to_string(), "Time_Seq");
    }

    #[test]
    fn test_field_counts() {
        assert_eq!(ActionType::Dark.field_count(), 3);
        assert_eq!(ActionType::Flat.field_count(), 3);
        assert_eq!(ActionType::Script.field_count(), 4);
        assert_eq!(ActionType::Quick.field_count(), 5);
        assert_eq!(ActionType::TimeSeq.field_count(), 6);
    }

    #[test]
    fn test_default_durations() {
        assert_eq!(ObservingAction::quick(1, 1.0, "M31", 600.0).duration_seconds, 300.0);
        assert_eq!(ObservingAction::dark(2, 1.0).duration_seconds, 1800.0);
        assert_eq!(ObservingAction::flat(3, 1.0).duration_seconds, 2400.0);

        let ts = ObservingAction::time_seq(4, 1.0, "V1", 2_460_000.5, 2_460_000.5 + 0.25);
        assert!((ts.duration_seconds - 21_600.0).abs() < 1e-6);
        assert!((ts.window_seconds().unwrap() - 21_600.0).abs() < 1e-6);
    }

    #[test]
    fn test_label() {
        assert_eq!(ObservingAction::script(1, 1.0, "RZ-Cas", 600.0).label(), "RZ-Cas");
        assert_eq!(ObservingAction::dark(2, 1.0).label(), "Dark");
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = ActionCatalog::new(vec![
            ObservingAction::script(10, 2.0, "M31", 600.0),
            ObservingAction::quick(11, 1.0, "M31", 900.0),
            ObservingAction::flat(12, 1.0),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get(11).unwrap().action_type, ActionType::Quick);
        assert!(catalog.get(99).is_none());
        assert_eq!(catalog.targets().into_iter().collect::<Vec<_>>(), vec!["M31"]);
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let result = ActionCatalog::new(vec![
            ObservingAction::dark(1, 1.0),
            ObservingAction::flat(1, 1.0),
        ]);
        assert!(result.is_err());
    }
}
