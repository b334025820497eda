//! Slot-permutation chromosome with delay genes.
//!
//! # Encoding
//!
//! The chromosome consists of two vectors:
//! - **sequence**: permutation of slot ids `0..n`. Each slot stands for
//!   one potential instance of an action; decoding places slots in this
//!   order.
//! - **delays**: indexed by slot id. Each gene indexes
//!   [`DELAY_TABLE_MINUTES`]; decoding starts the slot's placement search
//!   that many minutes into the session.
//!
//! Delay genes belong to slots, not positions, so they travel with their
//! slot through crossover and mutation.
//!
//! # Reference
//! - Davis (1985), "Applying Adaptive Algorithms to Epistatic Domains" (OX)
//! - Syswerda (1991), "Schedule Optimization Using Genetic Algorithms"

use rand::seq::SliceRandom;
use rand::Rng;

use super::runner::Individual;
use crate::scheduler::ScheduleFitness;

/// Placement delays selectable by a delay gene (minutes).
///
/// Half of the entries are zero, so a random gene usually means
/// "as early as possible".
pub const DELAY_TABLE_MINUTES: [i64; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 5, 10, 15, 30, 60, 120];

/// Delay of a gene (s).
#[inline]
pub fn delay_seconds(gene: u8) -> i64 {
    DELAY_TABLE_MINUTES[gene as usize % DELAY_TABLE_MINUTES.len()] * 60
}

/// Permutation-with-delays chromosome.
///
/// Higher fitness = better schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationChromosome {
    /// Slot ids in placement order.
    pub sequence: Vec<u32>,
    /// Delay gene per slot id.
    pub delays: Vec<u8>,
    /// Fitness, `None` until evaluated.
    pub fitness: Option<ScheduleFitness>,
}

impl Individual for ObservationChromosome {
    type Fitness = ScheduleFitness;
    type Key = (Vec<u32>, Vec<u8>);

    fn fitness(&self) -> Option<ScheduleFitness> {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: ScheduleFitness) {
        self.fitness = Some(fitness);
    }

    fn reset_fitness(&mut self) {
        self.fitness = None;
    }

    fn cache_key(&self) -> Self::Key {
        (self.sequence.clone(), self.delays.clone())
    }

    /// Two chromosomes are clones when they decode to the same placements.
    fn is_clone_of(&self, other: &Self) -> bool {
        match (self.fitness, other.fitness) {
            (Some(a), Some(b)) => a == b && a.signature == b.signature,
            _ => false,
        }
    }
}

impl ObservationChromosome {
    /// Random order, random delays.
    pub fn random<R: Rng>(slot_count: usize, rng: &mut R) -> Self {
        let mut sequence: Vec<u32> = (0..slot_count as u32).collect();
        sequence.shuffle(rng);
        let delays = (0..slot_count)
            .map(|_| rng.random_range(0..DELAY_TABLE_MINUTES.len()) as u8)
            .collect();
        Self {
            sequence,
            delays,
            fitness: None,
        }
    }

    /// Given order, no delays.
    pub fn from_order(sequence: Vec<u32>) -> Self {
        let delays = vec![0; sequence.len()];
        Self {
            sequence,
            delays,
            fitness: None,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Placement delay of a slot (s).
    pub fn delay_of(&self, slot: u32) -> i64 {
        self.delays
            .get(slot as usize)
            .map(|&g| delay_seconds(g))
            .unwrap_or(0)
    }

    /// Whether `sequence` is a permutation of `0..slot_count` with one
    /// delay gene per slot.
    pub fn is_valid(&self, slot_count: usize) -> bool {
        if self.sequence.len() != slot_count || self.delays.len() != slot_count {
            return false;
        }
        let mut seen = vec![false; slot_count];
        for &slot in &self.sequence {
            match seen.get_mut(slot as usize) {
                Some(flag) if !*flag => *flag = true,
                _ => return false,
            }
        }
        true
    }
}

// ======================== Crossover operators ========================

/// Performs OX (order crossover).
///
/// Each child keeps a random segment of one parent in place and fills the
/// other positions with the remaining slots in the other parent's order.
///
/// # Reference
/// Davis (1985)
pub fn order_crossover<R: Rng>(
    p1: &ObservationChromosome,
    p2: &ObservationChromosome,
    rng: &mut R,
) -> (ObservationChromosome, ObservationChromosome) {
    let len = p1.sequence.len();
    if len < 2 || p2.sequence.len() != len {
        return (p1.clone(), p2.clone());
    }
    let mut i = rng.random_range(0..len);
    let mut j = rng.random_range(0..len);
    if i > j {
        std::mem::swap(&mut i, &mut j);
    }
    (
        ox_build_child(p1, p2, i, j),
        ox_build_child(p2, p1, i, j),
    )
}

fn ox_build_child(
    keeper: &ObservationChromosome,
    donor: &ObservationChromosome,
    i: usize,
    j: usize,
) -> ObservationChromosome {
    let len = keeper.sequence.len();
    let mut kept = vec![false; len];
    for &slot in &keeper.sequence[i..=j] {
        kept[slot as usize] = true;
    }

    let mut delays = donor.delays.clone();
    let mut fill = donor.sequence.iter().filter(|&&s| !kept[s as usize]);
    let mut sequence = Vec::with_capacity(len);
    for (pos, &slot) in keeper.sequence.iter().enumerate() {
        if (i..=j).contains(&pos) {
            sequence.push(slot);
            delays[slot as usize] = keeper.delays[slot as usize];
        } else if let Some(&s) = fill.next() {
            sequence.push(s);
        }
    }
    ObservationChromosome {
        sequence,
        delays,
        fitness: None,
    }
}

/// Performs a one-point order crossover (splice).
///
/// Each child takes a prefix of one parent and appends the remaining
/// slots in the other parent's order.
pub fn splice_crossover<R: Rng>(
    p1: &ObservationChromosome,
    p2: &ObservationChromosome,
    rng: &mut R,
) -> (ObservationChromosome, ObservationChromosome) {
    let len = p1.sequence.len();
    if len < 2 || p2.sequence.len() != len {
        return (p1.clone(), p2.clone());
    }
    let cut = rng.random_range(1..len);
    (
        ox_build_child(p1, p2, 0, cut - 1),
        ox_build_child(p2, p1, 0, cut - 1),
    )
}

// ======================== Mutation operators ========================

/// Swap mutation: exchanges two random positions.
pub fn swap_mutation<R: Rng>(chromosome: &mut ObservationChromosome, rng: &mut R) {
    let len = chromosome.sequence.len();
    if len < 2 {
        return;
    }
    let i = rng.random_range(0..len);
    let j = rng.random_range(0..len);
    chromosome.sequence.swap(i, j);
}

/// Insert mutation: removes a slot and reinserts it at a random position.
pub fn insert_mutation<R: Rng>(chromosome: &mut ObservationChromosome, rng: &mut R) {
    let len = chromosome.sequence.len();
    if len < 2 {
        return;
    }
    let from = rng.random_range(0..len);
    let to = rng.random_range(0..len);
    let slot = chromosome.sequence.remove(from);
    chromosome.sequence.insert(to, slot);
}

/// Invert mutation: reverses a random segment.
pub fn invert_mutation<R: Rng>(chromosome: &mut ObservationChromosome, rng: &mut R) {
    let len = chromosome.sequence.len();
    if len < 2 {
        return;
    }
    let mut i = rng.random_range(0..len);
    let mut j = rng.random_range(0..len);
    if i > j {
        std::mem::swap(&mut i, &mut j);
    }
    chromosome.sequence[i..=j].reverse();
}

/// Rotate mutation: rotates a random segment left by a random amount.
pub fn rotate_mutation<R: Rng>(chromosome: &mut ObservationChromosome, rng: &mut R) {
    let len = chromosome.sequence.len();
    if len < 2 {
        return;
    }
    let mut i = rng.random_range(0..len);
    let mut j = rng.random_range(0..len);
    if i > j {
        std::mem::swap(&mut i, &mut j);
    }
    let segment = &mut chromosome.sequence[i..=j];
    let by = rng.random_range(0..segment.len());
    segment.rotate_left(by);
}

/// Delay mutation: re-rolls one random delay gene.
pub fn delay_mutation<R: Rng>(chromosome: &mut ObservationChromosome, rng: &mut R) {
    if chromosome.delays.is_empty() {
        return;
    }
    let idx = rng.random_range(0..chromosome.delays.len());
    chromosome.delays[idx] = rng.random_range(0..DELAY_TABLE_MINUTES.len()) as u8;
}
