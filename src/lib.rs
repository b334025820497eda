//! Night-session observation scheduler.
//!
//! Given a session window and a catalog of observing actions, finds an
//! ordering and set of start times that maximises the total priority of
//! what gets observed. Every placed observation is visible above the site
//! horizon at its start and end, respects Quick cadence and Time_Seq
//! windows, and never overlaps another.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `ObservingAction`, `ActionCatalog`,
//!   `Session`, `CandidateSchedule`, `ScheduledInstance`, `TimeWindow`
//! - **`sky`**: Horizon table, target locator, precomputed visibility map
//! - **`duration`**: Duration estimates from history and target plans
//! - **`scheduler`**: Placement evaluator, fitness and the `NightScheduler` facade
//! - **`ga`**: Generational GA engine and the slot/delay chromosome
//! - **`validation`**: Catalog checks and the schedule audit
//! - **`input`**: Session file parsing
//! - **`emit`**: Text and JSON schedule output
//! - **`config`**: TOML configuration
//! - **`pipeline`**: File-to-file run used by the `scheduler` binary
//!
//! # Time
//!
//! Absolute times are Julian Dates at the I/O boundary. Inside the engine
//! every time is whole seconds from session start, and starts and
//! durations sit on a fixed placement grid.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"
//! - Meeus (1998), "Astronomical Algorithms", Ch. 12-13

pub mod config;
pub mod duration;
pub mod emit;
pub mod error;
pub mod ga;
pub mod input;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod sky;
pub mod validation;

pub use error::{Result, SchedulerError};
