//! Night scheduler facade.
//!
//! # Algorithm
//!
//! 1. Precompute target visibility on the placement grid.
//! 2. Expand the catalog into chromosome slots.
//! 3. Run the GA; each individual is decoded by greedy placement.
//! 4. Decode the best individual and audit it.
//!
//! An empty catalog short-circuits to an empty schedule.

use log::{info, warn};

use super::fitness::{ScheduleFitness, ScheduleKpi};
use super::placement::Placer;
use crate::ga::{
    GaConfig, GaRunner, GeneticOperators, ScheduleProblem, StopReason,
    DEFAULT_MAX_QUICK_INSTANCES,
};
use crate::models::{ActionCatalog, CandidateSchedule, Session};
use crate::sky::{HorizonTable, TargetLocator};
use crate::validation::audit_schedule;

/// Default placement grid (s).
pub const DEFAULT_GRID_SECONDS: i64 = 60;

/// Input container for scheduling one night.
#[derive(Clone, Copy)]
pub struct ScheduleRequest<'a> {
    /// Session boundary.
    pub session: &'a Session,
    /// Candidate actions.
    pub catalog: &'a ActionCatalog,
    /// Coordinate transform.
    pub locator: &'a dyn TargetLocator,
    /// Site horizon.
    pub horizon: &'a HorizonTable,
}

impl<'a> ScheduleRequest<'a> {
    /// Creates a new schedule request.
    pub fn new(
        session: &'a Session,
        catalog: &'a ActionCatalog,
        locator: &'a dyn TargetLocator,
        horizon: &'a HorizonTable,
    ) -> Self {
        Self {
            session,
            catalog,
            locator,
            horizon,
        }
    }
}

/// Result of scheduling one night.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// Best schedule found, in time order.
    pub schedule: CandidateSchedule,
    pub fitness: ScheduleFitness,
    pub kpi: ScheduleKpi,
    /// Generations bred.
    pub generations: usize,
    /// Best fitness after initialisation and after each generation.
    pub history: Vec<ScheduleFitness>,
    /// `None` when there was nothing to search.
    pub stop_reason: Option<StopReason>,
}

/// GA-driven night scheduler.
///
/// # Example
///
/// ```
/// use sky_schedule::models::{ActionCatalog, ObservingAction, Session};
/// use sky_schedule::scheduler::{NightScheduler, ScheduleRequest};
/// use sky_schedule::sky::{CatalogLocator, HorizonTable, Site};
/// use sky_schedule::ga::GaConfig;
///
/// let session = Session::spanning(2_460_000.5, 3600, "-").unwrap();
/// let catalog = ActionCatalog::new(vec![
///     ObservingAction::dark(1, 1.0),
///     ObservingAction::flat(2, 1.0),
/// ]).unwrap();
/// let locator = CatalogLocator::new(Site::default());
/// let horizon = HorizonTable::flat(0.0);
///
/// let scheduler = NightScheduler::new()
///     .with_ga_config(GaConfig::default().with_max_generations(20));
/// let outcome = scheduler.schedule(&ScheduleRequest::new(&session, &catalog, &locator, &horizon));
/// assert_eq!(outcome.schedule.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct NightScheduler {
    ga: GaConfig,
    operators: GeneticOperators,
    grid_seconds: i64,
    max_quick_instances: usize,
}

impl Default for NightScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl NightScheduler {
    /// Creates a scheduler with default settings.
    pub fn new() -> Self {
        Self {
            ga: GaConfig::default(),
            operators: GeneticOperators::default(),
            grid_seconds: DEFAULT_GRID_SECONDS,
            max_quick_instances: DEFAULT_MAX_QUICK_INSTANCES,
        }
    }

    /// Sets GA hyperparameters.
    pub fn with_ga_config(mut self, ga: GaConfig) -> Self {
        self.ga = ga;
        self
    }

    /// Sets the genetic operators.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    /// Sets the placement grid (s).
    pub fn with_grid_seconds(mut self, grid_seconds: i64) -> Self {
        self.grid_seconds = grid_seconds.max(1);
        self
    }

    /// Caps the slots given to one Quick action.
    pub fn with_max_quick_instances(mut self, max: usize) -> Self {
        self.max_quick_instances = max.max(1);
        self
    }

    /// Schedules the request's catalog into its session.
    pub fn schedule(&self, request: &ScheduleRequest<'_>) -> ScheduleOutcome {
        let session = request.session;
        let session_seconds = session.duration_seconds();
        info!(
            "session {} .. {} ({}s), {} actions",
            fmt_utc(session, 0),
            fmt_utc(session, session_seconds),
            session_seconds,
            request.catalog.len()
        );

        if request.catalog.is_empty() {
            let schedule = CandidateSchedule::new();
            let fitness = ScheduleFitness::evaluate(&schedule, session_seconds, |_| 0.0);
            return ScheduleOutcome {
                kpi: ScheduleKpi::calculate(&schedule, request.catalog, session_seconds),
                schedule,
                fitness,
                generations: 0,
                history: vec![fitness],
                stop_reason: None,
            };
        }

        let placer = Placer::for_session(
            session,
            self.grid_seconds,
            request.catalog,
            request.locator,
            request.horizon,
        );
        let problem = ScheduleProblem::with_quick_cap(
            session,
            request.catalog,
            placer,
            self.max_quick_instances,
        )
        .with_operators(self.operators.clone());
        info!("{} chromosome slots", problem.slot_count());

        let result = GaRunner::run(&problem, &self.ga);
        let schedule = problem.decode(&result.best);
        let fitness = problem.score(&schedule);

        for violation in audit_schedule(&schedule, &problem) {
            warn!("schedule check failed: {}", violation.message);
        }

        let kpi = ScheduleKpi::calculate(&schedule, request.catalog, session_seconds);
        info!(
            "best schedule: {} instances, value {:.6}, busy {}s, idle {}s ({:.1}% used)",
            kpi.instance_count,
            fitness.value,
            kpi.busy_seconds,
            kpi.idle_seconds,
            kpi.utilization * 100.0
        );
        if !kpi.unscheduled.is_empty() {
            info!("unscheduled actions: {:?}", kpi.unscheduled);
        }

        ScheduleOutcome {
            schedule,
            fitness,
            kpi,
            generations: result.generations,
            history: result.history,
            stop_reason: Some(result.stop_reason),
        }
    }
}

fn fmt_utc(session: &Session, offset: i64) -> String {
    session
        .utc_at(offset)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("JD {:.6}", session.jd_at(offset)))
}
