//! Scheduling domain models.
//!
//! Provides the core data types for a night's observing problem and its
//! solutions.
//!
//! # Domain Mappings
//!
//! | sky-schedule | Job-shop analogue |
//! |--------------|-------------------|
//! | ObservingAction | Task |
//! | Session | Planning horizon |
//! | Telescope (implicit, single) | Resource |
//! | CandidateSchedule | Schedule |
//! | ScheduledInstance | Assignment |

mod action;
mod schedule;
mod session;
mod window;

pub use action::{
    ActionCatalog, ActionId, ActionType, ObservingAction, DARK_DURATION_SECONDS,
    FLAT_DURATION_SECONDS, QUICK_DURATION_SECONDS,
};
pub use schedule::{CandidateSchedule, ScheduledInstance, Violation, ViolationType};
pub use session::{jd_to_utc, Session, SECONDS_PER_DAY, UNIX_EPOCH_JD};
pub use window::{align_down, align_up, TimeWindow};
