//! Observation scheduling GA problem definition.
//!
//! Implements [`GaProblem`] for a night's action catalog. Bridges the
//! domain models (catalog, session, sky) to the generic GA engine.
//!
//! # Decoding
//!
//! Slots are placed greedily in chromosome order. Each slot searches for
//! the earliest feasible start at or after its delay; a slot with no
//! feasible start is skipped.
//!
//! # Reference
//! Syswerda (1991), "Schedule Optimization Using Genetic Algorithms"

use std::collections::HashMap;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::chromosome::ObservationChromosome;
use super::operators::GeneticOperators;
use super::runner::GaProblem;
use crate::models::{
    ActionCatalog, ActionId, ActionType, CandidateSchedule, ScheduledInstance, Session,
};
use crate::scheduler::{Placer, PreparedAction, ScheduleFitness};

/// Default cap on the slots given to one Quick action.
pub const DEFAULT_MAX_QUICK_INSTANCES: usize = 64;

/// Fraction of the initial population seeded in priority order.
const PRIORITY_SEED_RATE: f64 = 0.2;

/// GA problem definition for one observing session.
///
/// # Example
/// ```no_run
/// use sky_schedule::ga::{GaConfig, GaRunner, ScheduleProblem};
/// use sky_schedule::models::{ActionCatalog, Session};
/// use sky_schedule::scheduler::Placer;
/// use sky_schedule::sky::{CatalogLocator, HorizonTable, Site};
///
/// let session = Session::new(2_460_000.5, 2_460_000.8, "night.log").unwrap();
/// let catalog = ActionCatalog::new(vec![/* ... */]).unwrap();
/// let locator = CatalogLocator::new(Site::default());
/// let placer = Placer::for_session(&session, 60, &catalog, &locator, &HorizonTable::flat(0.0));
/// let problem = ScheduleProblem::new(&session, &catalog, placer);
/// let result = GaRunner::run(&problem, &GaConfig::default());
/// ```
pub struct ScheduleProblem {
    session: Session,
    session_seconds: i64,
    /// Catalog actions in grid seconds, in catalog order.
    actions: Vec<PreparedAction>,
    /// Slot id → index into `actions`.
    slots: Vec<usize>,
    by_id: HashMap<ActionId, usize>,
    placer: Placer,
    operators: GeneticOperators,
}

impl ScheduleProblem {
    /// Creates a problem with the default Quick slot cap and operators.
    pub fn new(session: &Session, catalog: &ActionCatalog, placer: Placer) -> Self {
        Self::with_quick_cap(session, catalog, placer, DEFAULT_MAX_QUICK_INSTANCES)
    }

    /// Creates a problem giving each Quick action at most `max_quick`
    /// slots.
    pub fn with_quick_cap(
        session: &Session,
        catalog: &ActionCatalog,
        placer: Placer,
        max_quick: usize,
    ) -> Self {
        let session_seconds = session.duration_seconds();
        let actions: Vec<PreparedAction> = catalog
            .actions()
            .iter()
            .map(|a| PreparedAction::new(a, session, placer.grid_seconds(), placer.visibility()))
            .collect();

        let mut slots = Vec::new();
        for (idx, action) in actions.iter().enumerate() {
            let count = match (action.action_type, action.cadence) {
                (ActionType::Quick, Some(cadence)) => {
                    ((session_seconds / cadence).max(1) as usize).min(max_quick.max(1))
                }
                _ => 1,
            };
            slots.extend(std::iter::repeat(idx).take(count));
        }
        debug!(
            "{} actions expanded to {} slots over {}s",
            actions.len(),
            slots.len(),
            session_seconds
        );

        let by_id = actions
            .iter()
            .enumerate()
            .map(|(idx, a)| (a.id, idx))
            .collect();

        Self {
            session: session.clone(),
            session_seconds,
            actions,
            slots,
            by_id,
            placer,
            operators: GeneticOperators::default(),
        }
    }

    /// Sets the genetic operators.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Session length (s).
    pub fn session_seconds(&self) -> i64 {
        self.session_seconds
    }

    pub fn placer(&self) -> &Placer {
        &self.placer
    }

    /// Prepared actions, in catalog order.
    pub fn actions(&self) -> &[PreparedAction] {
        &self.actions
    }

    /// Prepared action by id.
    pub fn action(&self, id: ActionId) -> Option<&PreparedAction> {
        self.by_id.get(&id).map(|&idx| &self.actions[idx])
    }

    /// Number of chromosome slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Action a slot stands for.
    pub fn slot_action(&self, slot: u32) -> Option<&PreparedAction> {
        self.slots.get(slot as usize).map(|&idx| &self.actions[idx])
    }

    /// Decodes a chromosome into a schedule.
    pub fn decode(&self, chromosome: &ObservationChromosome) -> CandidateSchedule {
        let mut schedule = CandidateSchedule::new();
        for &slot in &chromosome.sequence {
            let Some(action) = self.slot_action(slot) else {
                continue;
            };
            let delay = chromosome.delay_of(slot);
            if let Some(start) = self.placer.try_place(action, &schedule, delay) {
                schedule.insert(ScheduledInstance::new(action.id, start, action.duration));
            }
        }
        schedule
    }

    /// Scores a decoded schedule.
    pub fn score(&self, schedule: &CandidateSchedule) -> ScheduleFitness {
        ScheduleFitness::evaluate(schedule, self.session_seconds, |id| {
            self.action(id).map(|a| a.priority).unwrap_or(0.0)
        })
    }

    /// Slots by descending priority, ties in random order.
    fn priority_ordered<R: Rng>(&self, rng: &mut R) -> ObservationChromosome {
        let mut sequence: Vec<u32> = (0..self.slots.len() as u32).collect();
        sequence.shuffle(rng);
        sequence.sort_by(|&a, &b| {
            let pa = self.actions[self.slots[a as usize]].priority;
            let pb = self.actions[self.slots[b as usize]].priority;
            pb.total_cmp(&pa)
        });
        ObservationChromosome::from_order(sequence)
    }
}

impl GaProblem for ScheduleProblem {
    type Individual = ObservationChromosome;

    fn create_individual<R: Rng>(&self, rng: &mut R) -> ObservationChromosome {
        // 20% priority-ordered, 80% random
        if rng.random_bool(PRIORITY_SEED_RATE) {
            self.priority_ordered(rng)
        } else {
            ObservationChromosome::random(self.slots.len(), rng)
        }
    }

    fn evaluate(&self, individual: &ObservationChromosome) -> ScheduleFitness {
        self.score(&self.decode(individual))
    }

    fn crossover<R: Rng>(
        &self,
        parent1: &ObservationChromosome,
        parent2: &ObservationChromosome,
        rng: &mut R,
    ) -> Vec<ObservationChromosome> {
        let (c1, c2) = self.operators.crossover(parent1, parent2, rng);
        vec![c1, c2]
    }

    fn mutate<R: Rng>(&self, individual: &mut ObservationChromosome, rng: &mut R) {
        self.operators.mutate(individual, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::{GaConfig, GaRunner, Individual};
    use crate::models::{ObservingAction, SECONDS_PER_DAY};
    use crate::sky::{AltAz, HorizonTable};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const START: f64 = 2_460_000.5;

    fn locator(target: &str, _jd: f64) -> Option<AltAz> {
        let deg: f64 = match target {
            "Up" => 60.0,
            "Down" => -30.0,
            _ => return None,
        };
        Some(AltAz {
            altitude: deg.to_radians(),
            azimuth: 0.0,
        })
    }

    fn make_test_problem() -> (ActionCatalog, ScheduleProblem) {
        let session = Session::spanning(START, 7200, "-").unwrap();
        let catalog = ActionCatalog::new(vec![
            ObservingAction::script(1, 5.0, "Up", 1800.0),
            ObservingAction::quick(2, 1.0, "Up", 1200.0),
            ObservingAction::script(3, 9.0, "Down", 600.0),
            ObservingAction::dark(4, 2.0),
            ObservingAction::time_seq(
                5,
                3.0,
                "Up",
                START + 3600.0 / SECONDS_PER_DAY,
                START + 4800.0 / SECONDS_PER_DAY,
            ),
        ])
        .unwrap();
        let horizon = HorizonTable::flat(0.0);
        let placer = Placer::for_session(&session, 60, &catalog, &locator, &horizon);
        let problem = ScheduleProblem::new(&session, &catalog, placer);
        (catalog, problem)
    }

    #[test]
    fn test_slot_expansion() {
        let (_, problem) = make_test_problem();
        // 4 single slots + 7200 / 1200 Quick slots
        assert_eq!(problem.slot_count(), 10);
        assert_eq!(problem.slot_action(4).unwrap().id, 2);
        assert!(problem.slot_action(99).is_none());
    }

    #[test]
    fn test_quick_cap() {
        let session = Session::spanning(START, 7200, "-").unwrap();
        let catalog =
            ActionCatalog::new(vec![ObservingAction::quick(1, 1.0, "Up", 60.0)]).unwrap();
        let horizon = HorizonTable::flat(0.0);
        let placer = Placer::for_session(&session, 60, &catalog, &locator, &horizon);
        let problem = ScheduleProblem::with_quick_cap(&session, &catalog, placer, 16);
        assert_eq!(problem.slot_count(), 16);
    }

    #[test]
    fn test_decode_chromosome() {
        let (_, problem) = make_test_problem();
        // Script 1, Time_Seq, Dark, then the Quick slots and Script 3.
        let order = vec![0, 9, 8, 1, 2, 3, 4, 5, 6, 7];
        let schedule = problem.decode(&ObservationChromosome::from_order(order));

        let first = schedule.instances()[0];
        assert_eq!((first.action_id, first.start, first.duration), (1, 0, 1800));
        assert!(!schedule.contains_action(3));
        let ts = schedule.instances_of(5).next().unwrap();
        assert_eq!((ts.start, ts.duration), (3600, 1200));
        assert_eq!(schedule.instances_of(4).next().unwrap().start, 1800);
        assert_eq!(schedule.instances_of(2).count(), 2);
        for pair in schedule.instances().windows(2) {
            assert!(pair[0].end() <= pair[1].start);
        }
    }

    #[test]
    fn test_delay_shifts_search() {
        let (_, problem) = make_test_problem();
        let mut ch = ObservationChromosome::from_order((0..problem.slot_count() as u32).collect());
        ch.delays[0] = 12; // 15 minutes
        let schedule = problem.decode(&ch);
        assert_eq!(schedule.instances_of(1).next().unwrap().start, 900);
    }

    #[test]
    fn test_fitness_computation() {
        let (_, problem) = make_test_problem();
        let mut rng = SmallRng::seed_from_u64(42);
        let ch = problem.create_individual(&mut rng);
        let fitness = problem.evaluate(&ch);
        assert!(fitness.value.is_finite());
        assert!(fitness.value > 0.0);
        assert!(fitness.idle_seconds >= 0);
    }

    #[test]
    fn test_crossover_and_mutation() {
        let (_, problem) = make_test_problem();
        let mut rng = SmallRng::seed_from_u64(42);
        let p1 = problem.create_individual(&mut rng);
        let p2 = problem.create_individual(&mut rng);

        let children = problem.crossover(&p1, &p2, &mut rng);
        assert_eq!(children.len(), 2);

        let mut child = children[0].clone();
        problem.mutate(&mut child, &mut rng);
        assert!(child.is_valid(problem.slot_count()));
    }

    #[test]
    fn test_ga_runner_integration() {
        let (_, problem) = make_test_problem();
        let config = GaConfig::default()
            .with_population_size(20)
            .with_max_generations(30)
            .with_seed(42)
            .with_parallel(false);

        let result = GaRunner::run(&problem, &config);
        assert!(result.generations > 0);
        let schedule = problem.decode(&result.best);
        assert_eq!(problem.score(&schedule), result.best_fitness);
        assert_eq!(result.best.fitness(), Some(result.best_fitness));
        // Script 1, Dark and the Time_Seq always fit together.
        assert!(result.best_fitness.value >= 10.0);
    }
}
