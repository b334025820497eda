//! Validation of observing actions and of finished schedules.
//!
//! Catalog checks run before scheduling and detect:
//! - Duplicate IDs
//! - Negative or non-finite priorities
//! - Non-positive duration estimates
//! - Non-positive Quick cadences
//! - Empty or inverted Time_Seq windows
//! - Targeted actions without a target
//!
//! [`audit_schedule`] re-checks every schedule invariant on a decoded
//! schedule: session bounds, no overlap, Quick cadence, Time_Seq window,
//! visibility at start and end, and one instance per single-shot action.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::ga::ScheduleProblem;
use crate::models::{
    ActionId, ActionType, CandidateSchedule, ObservingAction, Violation, ViolationType,
};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two actions share the same ID.
    DuplicateId,
    /// Priority is negative or not a number.
    InvalidPriority,
    /// Duration estimate is not a positive number.
    InvalidDuration,
    /// Quick cadence is missing or not positive.
    InvalidCadence,
    /// Time_Seq window is missing, empty or inverted.
    InvalidWindow,
    /// A Script, Quick or Time_Seq action has no target.
    MissingTarget,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates a single action.
pub fn validate_action(action: &ObservingAction) -> ValidationResult {
    let mut errors = Vec::new();
    let id = action.id;

    if !(action.priority >= 0.0) || !action.priority.is_finite() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidPriority,
            format!("Action {id}: priority {} must be a non-negative number", action.priority),
        ));
    }

    if !(action.duration_seconds > 0.0) || !action.duration_seconds.is_finite() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidDuration,
            format!("Action {id}: duration {} must be positive", action.duration_seconds),
        ));
    }

    if action.action_type.has_target() && action.target.as_deref().map_or(true, str::is_empty) {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingTarget,
            format!("Action {id}: {} needs a target", action.action_type),
        ));
    }

    if action.action_type == ActionType::Quick {
        match action.cadence_seconds {
            Some(c) if c > 0.0 && c.is_finite() => {}
            other => errors.push(ValidationError::new(
                ValidationErrorKind::InvalidCadence,
                format!("Action {id}: cadence {other:?} must be positive"),
            )),
        }
    }

    if action.action_type == ActionType::TimeSeq {
        match action.window_jd {
            Some((start, end)) if start.is_finite() && end.is_finite() && end > start => {}
            other => errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWindow,
                format!("Action {id}: window {other:?} must have end after start"),
            )),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a whole catalog.
///
/// Checks every action and that IDs are unique.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_catalog(actions: &[ObservingAction]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();

    for action in actions {
        if !ids.insert(action.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate action ID: {}", action.id),
            ));
        }
        if let Err(mut action_errors) = validate_action(action) {
            errors.append(&mut action_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks a schedule against every placement invariant of its problem.
///
/// Returns all violations found; an empty list means the schedule is
/// valid.
pub fn audit_schedule(schedule: &CandidateSchedule, problem: &ScheduleProblem) -> Vec<Violation> {
    let mut violations = Vec::new();
    let session_seconds = problem.session_seconds();
    let visibility = problem.placer().visibility();
    let mut last_start: HashMap<ActionId, i64> = HashMap::new();
    let mut prev_end: Option<(ActionId, i64)> = None;

    for instance in schedule.instances() {
        let id = instance.action_id;
        let window = instance.window();

        let Some(action) = problem.action(id) else {
            violations.push(Violation::new(
                ViolationType::UnknownOrRepeated,
                id,
                format!("Action {id} is not in the catalog"),
            ));
            continue;
        };

        if window.start < 0 || window.end > session_seconds {
            violations.push(Violation::new(
                ViolationType::OutsideSession,
                id,
                format!(
                    "Action {id} runs {}..{}s outside the session 0..{session_seconds}s",
                    window.start, window.end
                ),
            ));
        }

        if let Some((other, end)) = prev_end {
            if window.start < end {
                violations.push(Violation::new(
                    ViolationType::Overlap,
                    id,
                    format!(
                        "Action {id} at {}s overlaps action {other} ending {end}s",
                        window.start
                    ),
                ));
            }
        }
        prev_end = Some((id, window.end));

        if let Some(previous) = last_start.insert(id, window.start) {
            match action.cadence {
                Some(cadence) if window.start - previous < cadence => {
                    violations.push(Violation::new(
                        ViolationType::CadenceTooShort,
                        id,
                        format!(
                            "Action {id} repeats after {}s, cadence is {cadence}s",
                            window.start - previous
                        ),
                    ));
                }
                Some(_) => {}
                None => violations.push(Violation::new(
                    ViolationType::UnknownOrRepeated,
                    id,
                    format!("Action {id} ({}) is scheduled more than once", action.action_type),
                )),
            }
        }

        if action.action_type == ActionType::TimeSeq
            && !action.window.is_some_and(|w| w.encloses(&window))
        {
            violations.push(Violation::new(
                ViolationType::OutsideWindow,
                id,
                format!("Action {id} runs {}..{}s outside its window", window.start, window.end),
            ));
        }

        if action.action_type.has_target() {
            let visible = action.target.is_some_and(|idx| {
                visibility.is_visible(idx, window.start) && visibility.is_visible(idx, window.end)
            });
            if !visible {
                violations.push(Violation::new(
                    ViolationType::NotVisible,
                    id,
                    format!(
                        "Action {id}: target not visible over {}..{}s",
                        window.start, window.end
                    ),
                ));
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionCatalog, ScheduledInstance, Session, TimeWindow, SECONDS_PER_DAY};
    use crate::scheduler::Placer;
    use crate::sky::{AltAz, HorizonTable};

    const START: f64 = 2_460_000.5;

    #[test]
    fn test_valid_catalog() {
        let actions = vec![
            ObservingAction::script(1, 1.0, "M31", 600.0),
            ObservingAction::quick(2, 0.0, "M42", 900.0),
            ObservingAction::time_seq(3, 2.0, "V1", START, START + 0.1),
            ObservingAction::dark(4, 1.0),
        ];
        assert!(validate_catalog(&actions).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let actions = vec![ObservingAction::dark(1, 1.0), ObservingAction::flat(1, 1.0)];
        let errors = validate_catalog(&actions).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::DuplicateId);
    }

    #[test]
    fn test_invalid_fields() {
        let kinds = |a: ObservingAction| -> Vec<ValidationErrorKind> {
            validate_action(&a).unwrap_err().into_iter().map(|e| e.kind).collect()
        };
        assert_eq!(
            kinds(ObservingAction::dark(1, -1.0)),
            vec![ValidationErrorKind::InvalidPriority]
        );
        assert_eq!(
            kinds(ObservingAction::script(1, 1.0, "M31", 0.0)),
            vec![ValidationErrorKind::InvalidDuration]
        );
        assert_eq!(
            kinds(ObservingAction::quick(1, 1.0, "M31", 0.0)),
            vec![ValidationErrorKind::InvalidCadence]
        );
        assert!(kinds(ObservingAction::time_seq(1, 1.0, "V1", START, START))
            .contains(&ValidationErrorKind::InvalidWindow));
        assert_eq!(
            kinds(ObservingAction::script(1, 1.0, "", 60.0)),
            vec![ValidationErrorKind::MissingTarget]
        );
    }

    fn locator(target: &str, jd: f64) -> Option<AltAz> {
        let t = (jd - START) * SECONDS_PER_DAY;
        let deg: f64 = match target {
            "Up" => 60.0,
            "Late" if t >= 1800.0 - 1e-3 => 60.0,
            "Late" => -5.0,
            _ => return None,
        };
        Some(AltAz {
            altitude: deg.to_radians(),
            azimuth: 0.0,
        })
    }

    fn problem() -> ScheduleProblem {
        let session = Session::spanning(START, 3600, "-").unwrap();
        let catalog = ActionCatalog::new(vec![
            ObservingAction::script(1, 1.0, "Late", 600.0),
            ObservingAction::quick(2, 1.0, "Up", 900.0),
            ObservingAction::time_seq(
                3,
                1.0,
                "Up",
                START + 600.0 / SECONDS_PER_DAY,
                START + 1200.0 / SECONDS_PER_DAY,
            ),
            ObservingAction::dark(4, 1.0),
        ])
        .unwrap();
        let horizon = HorizonTable::flat(0.0);
        let placer = Placer::for_session(&session, 60, &catalog, &locator, &horizon);
        ScheduleProblem::new(&session, &catalog, placer)
    }

    fn kinds(violations: &[Violation]) -> Vec<ViolationType> {
        violations.iter().map(|v| v.violation_type).collect()
    }

    #[test]
    fn test_audit_accepts_valid_schedule() {
        let problem = problem();
        let mut s = CandidateSchedule::new();
        s.insert(ScheduledInstance::new(2, 0, 300));
        s.insert(ScheduledInstance::new(3, 600, 600));
        s.insert(ScheduledInstance::new(2, 1200, 300));
        s.insert(ScheduledInstance::new(1, 1800, 600));
        s.insert(ScheduledInstance::new(4, 2400, 1200));
        assert!(audit_schedule(&s, &problem).is_empty());
    }

    #[test]
    fn test_audit_flags_each_violation() {
        let problem = problem();

        let mut overlap = CandidateSchedule::new();
        overlap.insert(ScheduledInstance::new(4, 0, 1200));
        overlap.insert(ScheduledInstance::new(2, 600, 300));
        assert_eq!(kinds(&audit_schedule(&overlap, &problem)), vec![ViolationType::Overlap]);

        let mut outside = CandidateSchedule::new();
        outside.insert(ScheduledInstance::new(4, 3000, 1200));
        assert_eq!(kinds(&audit_schedule(&outside, &problem)), vec![ViolationType::OutsideSession]);

        let mut cadence = CandidateSchedule::new();
        cadence.insert(ScheduledInstance::new(2, 0, 300));
        cadence.insert(ScheduledInstance::new(2, 600, 300));
        assert_eq!(
            kinds(&audit_schedule(&cadence, &problem)),
            vec![ViolationType::CadenceTooShort]
        );

        let mut window = CandidateSchedule::new();
        window.insert(ScheduledInstance::new(3, 900, 600));
        assert_eq!(kinds(&audit_schedule(&window, &problem)), vec![ViolationType::OutsideWindow]);

        let mut hidden = CandidateSchedule::new();
        hidden.insert(ScheduledInstance::new(1, 1200, 600));
        assert_eq!(kinds(&audit_schedule(&hidden, &problem)), vec![ViolationType::NotVisible]);

        let mut repeated = CandidateSchedule::new();
        repeated.insert(ScheduledInstance::new(4, 0, 1200));
        repeated.insert(ScheduledInstance::new(4, 1200, 1200));
        repeated.insert(ScheduledInstance::new(99, 2400, 60));
        assert_eq!(
            kinds(&audit_schedule(&repeated, &problem)),
            vec![ViolationType::UnknownOrRepeated, ViolationType::UnknownOrRepeated]
        );
    }

    #[test]
    fn test_audit_checks_input_window() {
        let session = Session::spanning(START, 3600, "-").unwrap();
        let catalog = ActionCatalog::new(vec![
            ObservingAction::time_seq(
                1,
                1.0,
                "Up",
                START + 630.0 / SECONDS_PER_DAY,
                START + 1230.0 / SECONDS_PER_DAY,
            ),
            ObservingAction::time_seq(
                2,
                1.0,
                "Nowhere",
                START + 2400.0 / SECONDS_PER_DAY,
                START + 3000.0 / SECONDS_PER_DAY,
            ),
        ])
        .unwrap();
        let horizon = HorizonTable::flat(0.0);
        let placer = Placer::for_session(&session, 60, &catalog, &locator, &horizon);
        let problem = ScheduleProblem::new(&session, &catalog, placer);
        assert_eq!(problem.action(1).unwrap().window, Some(TimeWindow::new(630, 1230)));

        let mut inside = CandidateSchedule::new();
        inside.insert(ScheduledInstance::new(1, 660, 540));
        assert!(audit_schedule(&inside, &problem).is_empty());

        let mut early = CandidateSchedule::new();
        early.insert(ScheduledInstance::new(1, 600, 540));
        assert_eq!(kinds(&audit_schedule(&early, &problem)), vec![ViolationType::OutsideWindow]);

        // Inside its window, but the target has no position.
        let mut unknown = CandidateSchedule::new();
        unknown.insert(ScheduledInstance::new(2, 2400, 600));
        assert_eq!(kinds(&audit_schedule(&unknown, &problem)), vec![ViolationType::NotVisible]);
    }
}
