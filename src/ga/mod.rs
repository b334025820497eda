//! GA-based observation scheduling.
//!
//! A small generational GA engine plus the scheduling-specific encoding.
//!
//! # Encoding
//!
//! - **sequence**: permutation of slot ids. Every action owns one slot,
//!   a Quick action owns one per possible repeat (capped).
//! - **delays**: per-slot index into a delay table, added to the start
//!   of that slot's placement search.
//!
//! # Submodules
//!
//! - [`operators`]: Runtime-selectable crossover and mutation strategies
//!
//! # Reference
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"
//! - Syswerda (1991), "Schedule Optimization Using Genetic Algorithms"

mod chromosome;
pub mod operators;
mod problem;
mod runner;

pub use chromosome::{
    delay_mutation, delay_seconds, insert_mutation, invert_mutation, order_crossover,
    rotate_mutation, splice_crossover, swap_mutation, ObservationChromosome,
    DELAY_TABLE_MINUTES,
};
pub use operators::{CrossoverType, GeneticOperators, MutationType};
pub use problem::{ScheduleProblem, DEFAULT_MAX_QUICK_INSTANCES};
pub use runner::{GaConfig, GaProblem, GaResult, GaRunner, Individual, StopReason};
