//! Configurable genetic operators for observation scheduling.
//!
//! Provides runtime-selectable crossover and mutation strategies
//! via [`GeneticOperators`].
//!
//! # Usage
//!
//! ```
//! use sky_schedule::ga::operators::{GeneticOperators, CrossoverType, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.crossover_type, CrossoverType::Order);
//! assert_eq!(ops.mutation_type, MutationType::SwapOrInsert);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chromosome::{
    delay_mutation, insert_mutation, invert_mutation, order_crossover, rotate_mutation,
    splice_crossover, swap_mutation, ObservationChromosome,
};

/// Crossover strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverType {
    /// Order crossover (Davis, 1985).
    Order,
    /// One-point order crossover.
    Splice,
}

/// Sequence mutation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    /// Swap two random positions.
    Swap,
    /// Remove and reinsert at a random position.
    Insert,
    /// Reverse a random segment.
    Invert,
    /// Rotate a random segment.
    Rotate,
    /// 50% swap, 50% insert.
    SwapOrInsert,
}

/// Runtime-selectable genetic operators.
///
/// # Example
///
/// ```
/// use sky_schedule::ga::operators::{GeneticOperators, CrossoverType, MutationType};
///
/// let ops = GeneticOperators {
///     crossover_type: CrossoverType::Splice,
///     mutation_type: MutationType::Invert,
///     delay_rate: 0.0,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticOperators {
    /// Crossover strategy.
    pub crossover_type: CrossoverType,
    /// Sequence mutation strategy.
    pub mutation_type: MutationType,
    /// Probability that a mutation also re-rolls one delay gene.
    pub delay_rate: f64,
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            crossover_type: CrossoverType::Order,
            mutation_type: MutationType::SwapOrInsert,
            delay_rate: 0.15,
        }
    }
}

impl GeneticOperators {
    /// Performs crossover using the configured strategy.
    pub fn crossover<R: Rng>(
        &self,
        p1: &ObservationChromosome,
        p2: &ObservationChromosome,
        rng: &mut R,
    ) -> (ObservationChromosome, ObservationChromosome) {
        match self.crossover_type {
            CrossoverType::Order => order_crossover(p1, p2, rng),
            CrossoverType::Splice => splice_crossover(p1, p2, rng),
        }
    }

    /// Performs mutation using the configured strategy.
    pub fn mutate<R: Rng>(&self, chromosome: &mut ObservationChromosome, rng: &mut R) {
        match self.mutation_type {
            MutationType::Swap => swap_mutation(chromosome, rng),
            MutationType::Insert => insert_mutation(chromosome, rng),
            MutationType::Invert => invert_mutation(chromosome, rng),
            MutationType::Rotate => rotate_mutation(chromosome, rng),
            MutationType::SwapOrInsert => {
                if rng.random_bool(0.5) {
                    swap_mutation(chromosome, rng)
                } else {
                    insert_mutation(chromosome, rng)
                }
            }
        }
        if rng.random_bool(self.delay_rate.clamp(0.0, 1.0)) {
            delay_mutation(chromosome, rng);
        }
    }
}
