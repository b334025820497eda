//! Generational GA engine.
//!
//! Problem-agnostic loop: initialise, evaluate, then repeatedly keep the
//! elites, breed the rest by tournament selection, crossover and mutation,
//! and re-evaluate. Fitness is maximised.
//!
//! # Determinism
//!
//! All random draws happen on the sequential breeding path from a single
//! `SmallRng` seeded by [`GaConfig::seed`]. Evaluation is pure and may run
//! in parallel (rayon) without affecting the result. Only a wall-clock
//! limit ([`GaConfig::time_limit_seconds`]) can make two runs differ.
//!
//! # Reference
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"
//! - Eiben & Smith (2015), "Introduction to Evolutionary Computing", Ch. 5

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A member of the population.
pub trait Individual: Clone + Send + Sync {
    /// Fitness value. Greater is better.
    type Fitness: Copy + PartialOrd + Debug + Send + Sync;
    /// Genotype identity used by the fitness cache.
    type Key: Eq + Hash + Send + Sync;

    /// Cached fitness, `None` until evaluated.
    fn fitness(&self) -> Option<Self::Fitness>;

    fn set_fitness(&mut self, fitness: Self::Fitness);

    /// Marks the individual as needing evaluation.
    fn reset_fitness(&mut self);

    fn cache_key(&self) -> Self::Key;

    /// Whether both individuals express the same solution.
    ///
    /// Used to keep clones of the leader out of the elite set.
    fn is_clone_of(&self, _other: &Self) -> bool {
        false
    }
}

/// Problem definition plugged into [`GaRunner`].
pub trait GaProblem: Sync {
    type Individual: Individual;

    fn create_individual<R: Rng>(&self, rng: &mut R) -> Self::Individual;

    /// Scores an individual. Must be pure.
    fn evaluate(
        &self,
        individual: &Self::Individual,
    ) -> <Self::Individual as Individual>::Fitness;

    fn crossover<R: Rng>(
        &self,
        parent1: &Self::Individual,
        parent2: &Self::Individual,
        rng: &mut R,
    ) -> Vec<Self::Individual>;

    fn mutate<R: Rng>(&self, individual: &mut Self::Individual, rng: &mut R);
}

// ======================== Configuration ========================

/// GA hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Individuals per generation.
    pub population_size: usize,
    /// Generation budget.
    pub max_generations: usize,
    /// Best individuals copied unchanged into the next generation.
    pub elite_count: usize,
    /// Contestants per tournament.
    pub tournament_size: usize,
    /// Probability that a selected pair is recombined.
    pub crossover_rate: f64,
    /// Per-child mutation probability.
    pub mutation_rate: f64,
    /// Generations without improvement before stopping.
    pub stagnation_limit: usize,
    /// Wall-clock budget (s). Disables run-to-run determinism when hit.
    pub time_limit_seconds: Option<f64>,
    /// RNG seed.
    pub seed: u64,
    /// Evaluate each generation in parallel.
    pub parallel: bool,
    /// Memoise fitness by genotype.
    pub cache: bool,
    /// Cache entries kept before the cache is flushed.
    pub cache_limit: usize,
    /// Progress is logged every `log_interval` generations.
    pub log_interval: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 70,
            max_generations: 1000,
            elite_count: 10,
            tournament_size: 3,
            crossover_rate: 0.8,
            mutation_rate: 0.3,
            stagnation_limit: 200,
            time_limit_seconds: None,
            seed: 42,
            parallel: true,
            cache: true,
            cache_limit: 500_000,
            log_interval: 40,
        }
    }
}

impl GaConfig {
    /// Sets population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Sets the generation budget.
    pub fn with_max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }

    /// Sets the stagnation limit.
    pub fn with_stagnation_limit(mut self, generations: usize) -> Self {
        self.stagnation_limit = generations;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_seconds = Some(seconds);
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enables or disables the fitness cache.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}

// ======================== Result ========================

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    GenerationLimit,
    Stagnation,
    TimeLimit,
}

/// Outcome of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<I: Individual> {
    /// Best individual seen in any generation.
    pub best: I,
    pub best_fitness: I::Fitness,
    /// Generations bred after the initial population.
    pub generations: usize,
    /// Best fitness after initialisation and after each generation.
    pub history: Vec<I::Fitness>,
    pub stop_reason: StopReason,
    /// Calls to [`GaProblem::evaluate`].
    pub evaluations: usize,
    /// Fitness cache lookups and hits.
    pub cache_tries: usize,
    pub cache_hits: usize,
    pub elapsed: Duration,
}

// ======================== Runner ========================

/// Runs a [`GaProblem`] to completion.
pub struct GaRunner;

impl GaRunner {
    /// Runs the GA and returns the best individual found.
    pub fn run<P: GaProblem>(problem: &P, config: &GaConfig) -> GaResult<P::Individual> {
        let started = Instant::now();
        let population_size = config.population_size.max(2);
        let elite_count = config.elite_count.min(population_size - 1);
        let tournament_size = config.tournament_size.max(1);
        let log_interval = config.log_interval.max(1);

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let mut cache = FitnessCache::new(config.cache, config.cache_limit);

        let mut population: Vec<P::Individual> = (0..population_size)
            .map(|_| problem.create_individual(&mut rng))
            .collect();
        let mut evaluations =
            evaluate_population(problem, &mut population, &mut cache, config.parallel);
        sort_best_first(&mut population);

        let mut best = population[0].clone();
        let mut best_fitness = fitness_of(&best);
        let mut history = vec![best_fitness];
        info!("generation 0: best {:?}", best_fitness);

        let mut generations = 0;
        let mut stagnation = 0;
        let stop_reason = loop {
            if generations >= config.max_generations {
                break StopReason::GenerationLimit;
            }
            if stagnation >= config.stagnation_limit {
                break StopReason::Stagnation;
            }
            if config
                .time_limit_seconds
                .is_some_and(|limit| started.elapsed().as_secs_f64() >= limit)
            {
                break StopReason::TimeLimit;
            }
            generations += 1;

            let mut next = select_elites(&population, elite_count);
            while next.len() < population_size {
                let p1 = tournament(&population, tournament_size, &mut rng);
                let p2 = tournament(&population, tournament_size, &mut rng);
                let children = if rng.random_bool(config.crossover_rate.clamp(0.0, 1.0)) {
                    problem.crossover(p1, p2, &mut rng)
                } else {
                    vec![p1.clone(), p2.clone()]
                };
                for mut child in children {
                    if next.len() >= population_size {
                        break;
                    }
                    if rng.random_bool(config.mutation_rate.clamp(0.0, 1.0)) {
                        problem.mutate(&mut child, &mut rng);
                        child.reset_fitness();
                    }
                    next.push(child);
                }
            }

            population = next;
            evaluations +=
                evaluate_population(problem, &mut population, &mut cache, config.parallel);
            sort_best_first(&mut population);

            let leader = fitness_of(&population[0]);
            if compare(&leader, &best_fitness) == Ordering::Greater {
                best = population[0].clone();
                best_fitness = leader;
                stagnation = 0;
            } else {
                stagnation += 1;
            }
            history.push(best_fitness);

            if generations % log_interval == 0 {
                info!("generation {generations}: best {:?}", best_fitness);
            }
        };

        info!(
            "search stopped after {generations} generations ({stop_reason:?}): best {:?}",
            best_fitness
        );
        info!(
            "fitness cache: {} tries, {} hits, {} entries",
            cache.tries,
            cache.hits,
            cache.entries.len()
        );

        GaResult {
            best,
            best_fitness,
            generations,
            history,
            stop_reason,
            evaluations,
            cache_tries: cache.tries,
            cache_hits: cache.hits,
            elapsed: started.elapsed(),
        }
    }
}

struct FitnessCache<I: Individual> {
    enabled: bool,
    limit: usize,
    entries: HashMap<I::Key, I::Fitness>,
    tries: usize,
    hits: usize,
}

impl<I: Individual> FitnessCache<I> {
    fn new(enabled: bool, limit: usize) -> Self {
        Self {
            enabled,
            limit: limit.max(1),
            entries: HashMap::new(),
            tries: 0,
            hits: 0,
        }
    }

    fn get(&mut self, key: &I::Key) -> Option<I::Fitness> {
        if !self.enabled {
            return None;
        }
        self.tries += 1;
        let found = self.entries.get(key).copied();
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    fn insert(&mut self, key: I::Key, fitness: I::Fitness) {
        if !self.enabled {
            return;
        }
        if self.entries.len() >= self.limit {
            debug!("fitness cache full ({} entries), flushing", self.entries.len());
            self.entries.clear();
        }
        self.entries.insert(key, fitness);
    }
}

/// Scores every unscored individual. Returns the number of evaluations.
fn evaluate_population<P: GaProblem>(
    problem: &P,
    population: &mut [P::Individual],
    cache: &mut FitnessCache<P::Individual>,
    parallel: bool,
) -> usize {
    let mut pending = Vec::new();
    for (idx, individual) in population.iter_mut().enumerate() {
        if individual.fitness().is_some() {
            continue;
        }
        match cache.get(&individual.cache_key()) {
            Some(fitness) => individual.set_fitness(fitness),
            None => pending.push(idx),
        }
    }

    let scores: Vec<_> = if parallel {
        let shared = &*population;
        pending
            .par_iter()
            .map(|&idx| problem.evaluate(&shared[idx]))
            .collect()
    } else {
        pending
            .iter()
            .map(|&idx| problem.evaluate(&population[idx]))
            .collect()
    };

    for (&idx, fitness) in pending.iter().zip(scores) {
        population[idx].set_fitness(fitness);
        cache.insert(population[idx].cache_key(), fitness);
    }
    pending.len()
}

fn compare<F: PartialOrd>(a: &F, b: &F) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

fn fitness_of<I: Individual>(individual: &I) -> I::Fitness {
    match individual.fitness() {
        Some(f) => f,
        None => unreachable!("individual read before evaluation"),
    }
}

/// Stable sort, best first. Unscored individuals sink to the end.
fn sort_best_first<I: Individual>(population: &mut [I]) {
    population.sort_by(|a, b| match (a.fitness(), b.fitness()) {
        (Some(fa), Some(fb)) => compare(&fb, &fa),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Takes the best `count` individuals of a sorted population, skipping
/// clones of an already chosen elite. Clones fill any remaining places.
fn select_elites<I: Individual>(population: &[I], count: usize) -> Vec<I> {
    let mut elites: Vec<I> = Vec::with_capacity(count);
    let mut skipped = Vec::new();
    for individual in population {
        if elites.len() >= count {
            break;
        }
        if elites.iter().any(|e| individual.is_clone_of(e)) {
            skipped.push(individual);
        } else {
            elites.push(individual.clone());
        }
    }
    for individual in skipped {
        if elites.len() >= count {
            break;
        }
        elites.push(individual.clone());
    }
    elites
}

fn tournament<'a, I: Individual, R: Rng>(population: &'a [I], size: usize, rng: &mut R) -> &'a I {
    let mut winner = &population[rng.random_range(0..population.len())];
    for _ in 1..size {
        let challenger = &population[rng.random_range(0..population.len())];
        if let (Some(c), Some(w)) = (challenger.fitness(), winner.fitness()) {
            if compare(&c, &w) == Ordering::Greater {
                winner = challenger;
            }
        }
    }
    winner
}

#[cfg(test)]
mod tests {
    use super::*;

    /// OneMax: maximise the number of set bits.
    #[derive(Debug, Clone)]
    struct Bits {
        genes: Vec<bool>,
        fitness: Option<usize>,
    }

    impl Individual for Bits {
        type Fitness = usize;
        type Key = Vec<bool>;

        fn fitness(&self) -> Option<usize> {
            self.fitness
        }

        fn set_fitness(&mut self, fitness: usize) {
            self.fitness = Some(fitness);
        }

        fn reset_fitness(&mut self) {
            self.fitness = None;
        }

        fn cache_key(&self) -> Vec<bool> {
            self.genes.clone()
        }

        fn is_clone_of(&self, other: &Self) -> bool {
            self.genes == other.genes
        }
    }

    struct OneMax(usize);

    impl GaProblem for OneMax {
        type Individual = Bits;

        fn create_individual<R: Rng>(&self, rng: &mut R) -> Bits {
            Bits {
                genes: (0..self.0).map(|_| rng.random_bool(0.2)).collect(),
                fitness: None,
            }
        }

        fn evaluate(&self, individual: &Bits) -> usize {
            individual.genes.iter().filter(|&&b| b).count()
        }

        fn crossover<R: Rng>(&self, p1: &Bits, p2: &Bits, rng: &mut R) -> Vec<Bits> {
            let cut = rng.random_range(0..=self.0);
            let mut c1 = p1.genes.clone();
            let mut c2 = p2.genes.clone();
            c1[cut..].copy_from_slice(&p2.genes[cut..]);
            c2[cut..].copy_from_slice(&p1.genes[cut..]);
            vec![
                Bits {
                    genes: c1,
                    fitness: None,
                },
                Bits {
                    genes: c2,
                    fitness: None,
                },
            ]
        }

        fn mutate<R: Rng>(&self, individual: &mut Bits, rng: &mut R) {
            if self.0 == 0 {
                return;
            }
            let idx = rng.random_range(0..self.0);
            individual.genes[idx] = !individual.genes[idx];
        }
    }

    fn config() -> GaConfig {
        GaConfig::default()
            .with_population_size(30)
            .with_max_generations(60)
            .with_elite_count(3)
            .with_seed(42)
    }

    #[test]
    fn test_best_fitness_never_decreases() {
        let result = GaRunner::run(&OneMax(40), &config());
        assert_eq!(result.history.len(), result.generations + 1);
        for pair in result.history.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(result.best.fitness(), Some(result.best_fitness));
        assert!(result.best_fitness > result.history[0] || result.best_fitness == 40);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let a = GaRunner::run(&OneMax(40), &config());
        let b = GaRunner::run(&OneMax(40), &config().with_parallel(false));
        assert_eq!(a.best.genes, b.best.genes);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_stagnation_stop() {
        // Every individual of a zero-length problem is optimal at once.
        let result = GaRunner::run(
            &OneMax(0),
            &config().with_stagnation_limit(5).with_max_generations(1000),
        );
        assert_eq!(result.stop_reason, StopReason::Stagnation);
        assert_eq!(result.generations, 5);
    }

    #[test]
    fn test_generation_limit_stop() {
        let result = GaRunner::run(&OneMax(200), &config().with_max_generations(3));
        assert_eq!(result.stop_reason, StopReason::GenerationLimit);
        assert_eq!(result.generations, 3);
    }

    #[test]
    fn test_time_limit_stop() {
        let result = GaRunner::run(
            &OneMax(40),
            &config().with_time_limit(0.0).with_max_generations(1000),
        );
        assert_eq!(result.stop_reason, StopReason::TimeLimit);
        assert_eq!(result.generations, 0);
        assert_eq!(result.history.len(), 1);
        assert_eq!(result.best.fitness(), Some(result.best_fitness));
        assert_eq!(result.evaluations, 30);
    }

    #[test]
    fn test_cache_counts_hits() {
        let result = GaRunner::run(&OneMax(4), &config());
        assert!(result.cache_hits > 0);
        assert!(result.cache_tries >= result.cache_hits);

        let uncached = GaRunner::run(&OneMax(4), &config().with_cache(false));
        assert_eq!(uncached.cache_tries, 0);
        assert_eq!(uncached.best_fitness, result.best_fitness);
    }

    #[test]
    fn test_elites_skip_clones() {
        let make = |genes: Vec<bool>, f: usize| Bits {
            genes,
            fitness: Some(f),
        };
        let population = vec![
            make(vec![true, true], 2),
            make(vec![true, true], 2),
            make(vec![true, false], 1),
            make(vec![false, false], 0),
        ];
        let elites = select_elites(&population, 2);
        assert_eq!(elites[0].genes, vec![true, true]);
        assert_eq!(elites[1].genes, vec![true, false]);

        let all = select_elites(&population, 4);
        assert_eq!(all.len(), 4);
    }
}
