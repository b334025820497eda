//! Placement, fitness and the night scheduler facade.
//!
//! # Placement
//!
//! [`Placer::try_place`] finds the earliest feasible grid start for one
//! action in a partial schedule: free of other instances, target visible
//! at start and end, Quick cadence kept, Time_Seq inside its window.
//!
//! # Fitness
//!
//! [`ScheduleFitness`] sums the priorities of scheduled instances and
//! breaks ties by less idle time. [`ScheduleKpi`] summarises a schedule
//! for logging.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Johnston & Miller (1994), "Spike: Intelligent Scheduling of Hubble Space Telescope Observations"

mod fitness;
mod night;
mod placement;

pub use fitness::{ScheduleFitness, ScheduleKpi};
pub use night::{NightScheduler, ScheduleOutcome, ScheduleRequest, DEFAULT_GRID_SECONDS};
pub use placement::{Placer, PreparedAction};
