//! Target position on the local sky.
//!
//! The scheduler only needs `(target, time) -> (altitude, azimuth)`.
//! [`CatalogLocator`] answers it for fixed catalog positions using mean
//! sidereal time; precession, nutation and refraction are ignored, which
//! is far below the resolution of any horizon table.
//!
//! # Reference
//! Meeus (1998), "Astronomical Algorithms", Ch. 12-13

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Julian Date of the J2000.0 epoch.
pub const J2000_JD: f64 = 2_451_545.0;

/// Horizontal coordinates (radians).
///
/// Azimuth is measured from South, increasing through West, in
/// −π..=π, matching the horizon table convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltAz {
    pub altitude: f64,
    pub azimuth: f64,
}

/// Coordinate transform collaborator.
///
/// Returns `None` for an unknown target.
pub trait TargetLocator: Send + Sync {
    fn locate(&self, target: &str, jd: f64) -> Option<AltAz>;
}

impl<F> TargetLocator for F
where
    F: Fn(&str, f64) -> Option<AltAz> + Send + Sync,
{
    fn locate(&self, target: &str, jd: f64) -> Option<AltAz> {
        self(target, jd)
    }
}

/// Observatory location.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    /// Geodetic latitude (deg, North positive).
    pub latitude_deg: f64,
    /// Longitude (deg, East positive).
    pub longitude_deg: f64,
}

/// Catalog position (J2000, degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equatorial {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

/// Locator for fixed catalog targets seen from one site.
#[derive(Debug, Clone, Default)]
pub struct CatalogLocator {
    site: Site,
    targets: HashMap<String, Equatorial>,
}

impl CatalogLocator {
    /// Creates an empty locator for a site.
    pub fn new(site: Site) -> Self {
        Self {
            site,
            targets: HashMap::new(),
        }
    }

    /// Adds a catalog target.
    pub fn with_target(mut self, name: impl Into<String>, position: Equatorial) -> Self {
        self.targets.insert(name.into(), position);
        self
    }

    /// Number of known targets.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

impl TargetLocator for CatalogLocator {
    fn locate(&self, target: &str, jd: f64) -> Option<AltAz> {
        self.targets
            .get(target)
            .map(|pos| equatorial_to_horizontal(pos, &self.site, jd))
    }
}

/// Greenwich mean sidereal time (deg, 0..360).
pub fn gmst_deg(jd: f64) -> f64 {
    (280.460_618_37 + 360.985_647_366_29 * (jd - J2000_JD)).rem_euclid(360.0)
}

/// Converts a catalog position to altitude/azimuth for `site` at `jd`.
pub fn equatorial_to_horizontal(pos: &Equatorial, site: &Site, jd: f64) -> AltAz {
    let lst = gmst_deg(jd) + site.longitude_deg;
    let hour_angle = (lst - pos.ra_deg).to_radians();
    let lat = site.latitude_deg.to_radians();
    let dec = pos.dec_deg.to_radians();

    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.cos();
    let altitude = sin_alt.clamp(-1.0, 1.0).asin();
    let mut azimuth = hour_angle
        .sin()
        .atan2(hour_angle.cos() * lat.sin() - dec.tan() * lat.cos());
    if azimuth <= -PI {
        azimuth += 2.0 * PI;
    }
    AltAz { altitude, azimuth }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NORTH_SITE: Site = Site {
        latitude_deg: 40.0,
        longitude_deg: -75.0,
    };

    #[test]
    fn test_gmst_at_j2000() {
        assert!((gmst_deg(J2000_JD) - 280.460_618_37).abs() < 1e-9);
    }

    #[test]
    fn test_meridian_transit() {
        // Put the target on the local meridian: RA = LST.
        let jd = 2_460_000.5;
        let lst = gmst_deg(jd) + NORTH_SITE.longitude_deg;
        let pos = Equatorial {
            ra_deg: lst.rem_euclid(360.0),
            dec_deg: 10.0,
        };
        let altaz = equatorial_to_horizontal(&pos, &NORTH_SITE, jd);
        // altitude = 90 - lat + dec
        assert!((altaz.altitude.to_degrees() - 60.0).abs() < 1e-6);
        // transit south of zenith: azimuth 0 (South)
        assert!(altaz.azimuth.abs() < 1e-6);
    }

    #[test]
    fn test_west_is_positive_azimuth() {
        let jd = 2_460_000.5;
        let lst = gmst_deg(jd) + NORTH_SITE.longitude_deg;
        // Three hours past transit: the target is in the West.
        let pos = Equatorial {
            ra_deg: (lst - 45.0).rem_euclid(360.0),
            dec_deg: 0.0,
        };
        let altaz = equatorial_to_horizontal(&pos, &NORTH_SITE, jd);
        assert!(altaz.azimuth > 0.0);
        assert!(altaz.altitude > 0.0);
    }

    #[test]
    fn test_pole_star_altitude_equals_latitude() {
        let pos = Equatorial {
            ra_deg: 0.0,
            dec_deg: 90.0,
        };
        let altaz = equatorial_to_horizontal(&pos, &NORTH_SITE, 2_460_123.25);
        assert!((altaz.altitude.to_degrees() - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_catalog_locator() {
        let locator = CatalogLocator::new(NORTH_SITE).with_target(
            "M31",
            Equatorial {
                ra_deg: 10.684,
                dec_deg: 41.269,
            },
        );
        assert_eq!(locator.target_count(), 1);
        assert!(locator.locate("M31", 2_460_000.5).is_some());
        assert!(locator.locate("M42", 2_460_000.5).is_none());
    }

    #[test]
    fn test_closure_locator() {
        let always_up = |_: &str, _: f64| {
            Some(AltAz {
                altitude: 1.0,
                azimuth: 0.0,
            })
        };
        assert_eq!(always_up.locate("anything", 0.0).unwrap().altitude, 1.0);
    }
}
