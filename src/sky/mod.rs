//! Sky geometry: where a target is, and whether the telescope can see it.
//!
//! # Submodules
//!
//! - `horizon`: site obstruction table and the visibility predicate
//! - `locator`: target to altitude/azimuth transform
//! - `visibility`: per-target visibility precomputed on the placement grid
//!
//! # Azimuth convention
//!
//! Azimuth is measured from South (0°) through West (+90°) to North
//! (±180°), the convention of the site horizon tables.

mod horizon;
mod locator;
mod visibility;

pub use horizon::{
    HorizonPoint, HorizonTable, ALWAYS_VISIBLE_ALTITUDE_DEG, NEVER_VISIBLE_ALTITUDE_DEG,
};
pub use locator::{
    equatorial_to_horizontal, gmst_deg, AltAz, CatalogLocator, Equatorial, Site, TargetLocator,
    J2000_JD,
};
pub use visibility::VisibilityMap;
