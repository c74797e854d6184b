//! # Keplerian orbital elements
//!
//! This module defines [`OrbitalElements`], the **resolved** two-body orbit of a
//! companion around the central body, and its validating builder
//! [`OrbitalElementsBuilder`].
//!
//! ## Parameterizations
//!
//! Callers rarely hold a complete element set. The builder accepts the usual
//! transit-fitting parameterizations and derives the rest:
//!
//! | Given | Derived |
//! |-------|---------|
//! | period `P` | semi-major axis `a` (Kepler's third law) |
//! | semi-major axis `a` | period `P` |
//! | period `P` + transit duration `T` (circular only) | semi-major axis `a` |
//! | inclination `i` | impact parameter `b` |
//! | impact parameter `b` | inclination `i` |
//! | time of transit `t₀` | time of periapsis `t_p` |
//! | time of periapsis `t_p` | time of transit `t₀` |
//!
//! ## Units
//!
//! - Lengths: **solar radii**
//! - Masses: **solar masses**
//! - Times: **days**
//! - Angles: **radians**
//!
//! ## Conventions
//!
//! The observer sits on the `+z` axis. A transit happens when `ω + f = π/2`,
//! i.e. the companion crosses the sky plane **in front** of the central body
//! (`z > 0`).
//!
//! ## Example
//!
//! ```rust, no_run
//! use keplight::system::Central;
//! use keplight::orbit_type::keplerian_element::OrbitalElements;
//!
//! let star = Central::new(1.0, 1.0).unwrap();
//! let elements = OrbitalElements::builder()
//!     .period(3.0)
//!     .time_transit(0.0)
//!     .impact_param(0.3)
//!     .radius(0.1)
//!     .build(&star)
//!     .unwrap();
//! println!("{elements}");
//! ```
use std::f64::consts::PI;
use std::fmt;

use nalgebra::{Rotation3, Vector3};

use crate::{
    constants::{Day, Radian, SolarMass, SolarRadius, DPI, G_GRAV},
    kepler::mean_anomaly_from_true,
    keplight_errors::KeplightError,
    system::Central,
};

/// Resolved Keplerian elements of one companion.
///
/// Instances are only produced by [`OrbitalElementsBuilder::build`], which
/// enforces the invariants `P > 0`, `a > 0`, `0 ≤ e < 1`, `M★ > 0`, `m ≥ 0`,
/// `R★ > 0`, `r ≥ 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalElements {
    period: f64,
    semi_major_axis: f64,
    eccentricity: f64,
    inclination: f64,
    periapsis_argument: f64,
    ascending_node_longitude: f64,
    time_transit: f64,
    time_periastron: f64,
    central_mass: f64,
    central_radius: f64,
    mass: f64,
    radius: f64,
    rotation: Rotation3<f64>,
}

impl OrbitalElements {
    /// Start a new [`OrbitalElementsBuilder`].
    pub fn builder() -> OrbitalElementsBuilder {
        OrbitalElementsBuilder::new()
    }

    pub fn period(&self) -> f64 {
        self.period
    }
    pub fn semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }
    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }
    pub fn inclination(&self) -> f64 {
        self.inclination
    }
    pub fn periapsis_argument(&self) -> f64 {
        self.periapsis_argument
    }
    pub fn ascending_node_longitude(&self) -> f64 {
        self.ascending_node_longitude
    }
    pub fn time_transit(&self) -> f64 {
        self.time_transit
    }
    pub fn time_periastron(&self) -> f64 {
        self.time_periastron
    }
    pub fn central_mass(&self) -> f64 {
        self.central_mass
    }
    pub fn central_radius(&self) -> f64 {
        self.central_radius
    }
    pub fn mass(&self) -> f64 {
        self.mass
    }
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Mean motion `n = 2π/P` (rad/day).
    pub fn mean_motion(&self) -> f64 {
        DPI / self.period
    }

    /// Total mass `M★ + m`.
    pub fn total_mass(&self) -> f64 {
        self.central_mass + self.mass
    }

    /// Radius ratio `r / R★`.
    pub fn radius_ratio(&self) -> f64 {
        self.radius / self.central_radius
    }

    /// Sky-projected separation at transit in units of the central radius.
    pub fn impact_param(&self) -> f64 {
        let e = self.eccentricity;
        let transit_distance =
            self.semi_major_axis * (1.0 - e * e) / (1.0 + e * self.periapsis_argument.sin());
        transit_distance * self.inclination.cos() / self.central_radius
    }

    /// Orbital plane → observer frame rotation `R_z(Ω)·R_x(i)·R_z(ω)`.
    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }

    /// Return a copy with a different eccentricity / periapsis argument,
    /// keeping the time of transit fixed.
    pub fn with_eccentricity(
        &self,
        eccentricity: f64,
        periapsis_argument: f64,
    ) -> Result<Self, KeplightError> {
        check_eccentricity(eccentricity)?;
        let mut updated = self.clone();
        updated.eccentricity = eccentricity;
        updated.periapsis_argument = periapsis_argument;
        updated.time_periastron = self.time_transit
            - transit_mean_anomaly(eccentricity, periapsis_argument) / self.mean_motion();
        updated.rotation = orbit_rotation(
            self.ascending_node_longitude,
            self.inclination,
            periapsis_argument,
        );
        Ok(updated)
    }

    /// Move the orbit around a different central body.
    ///
    /// The period, the orientation and the time of transit are kept, the
    /// semi-major axis follows from Kepler's third law with the new total mass.
    pub fn recentered(&self, central: &Central) -> Self {
        let mut updated = self.clone();
        updated.central_mass = central.mass();
        updated.central_radius = central.radius();
        updated.semi_major_axis =
            (G_GRAV * updated.total_mass() * self.period * self.period / (DPI * DPI)).cbrt();
        updated
    }
}

/// Mean anomaly at which the companion transits (`f = π/2 − ω`).
pub(crate) fn transit_mean_anomaly(eccentricity: f64, periapsis_argument: f64) -> f64 {
    mean_anomaly_from_true(0.5 * PI - periapsis_argument, eccentricity)
}

fn orbit_rotation(node: f64, inclination: f64, periapsis: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), node)
        * Rotation3::from_axis_angle(&Vector3::x_axis(), inclination)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), periapsis)
}

fn check_eccentricity(e: f64) -> Result<(), KeplightError> {
    if (0.0..1.0).contains(&e) {
        Ok(())
    } else {
        Err(KeplightError::InvalidEccentricity(e))
    }
}

fn check_positive(name: &str, v: f64) -> Result<(), KeplightError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(KeplightError::InvalidOrbitalElements(format!(
            "{name} must be > 0, got {v}"
        )))
    }
}

fn check_finite(name: &str, v: f64) -> Result<(), KeplightError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(KeplightError::InvalidOrbitalElements(format!(
            "{name} must be finite, got {v}"
        )))
    }
}

fn check_non_negative(name: &str, v: f64) -> Result<(), KeplightError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(KeplightError::InvalidOrbitalElements(format!(
            "{name} must be >= 0, got {v}"
        )))
    }
}

/// Builder for [`OrbitalElements`], with validation.
///
/// Defaults: `e = 0`, `ω = 0`, `Ω = 0`, `b = 0` (edge-on), `t₀ = 0`,
/// `m = 0` (test particle), `r = 0` (point companion).
#[derive(Debug, Clone, Default)]
pub struct OrbitalElementsBuilder {
    period: Option<f64>,
    semi_major_axis: Option<f64>,
    duration: Option<f64>,
    eccentricity: f64,
    periapsis_argument: f64,
    ascending_node_longitude: f64,
    inclination: Option<f64>,
    impact_param: Option<f64>,
    time_transit: Option<f64>,
    time_periastron: Option<f64>,
    mass: f64,
    radius: f64,
}

impl OrbitalElementsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(mut self, v: Day) -> Self {
        self.period = Some(v);
        self
    }
    pub fn semi_major_axis(mut self, v: SolarRadius) -> Self {
        self.semi_major_axis = Some(v);
        self
    }
    /// Total transit duration (first to fourth contact); circular orbits only.
    pub fn duration(mut self, v: Day) -> Self {
        self.duration = Some(v);
        self
    }
    pub fn eccentricity(mut self, v: f64) -> Self {
        self.eccentricity = v;
        self
    }
    pub fn periapsis_argument(mut self, v: Radian) -> Self {
        self.periapsis_argument = v;
        self
    }
    pub fn ascending_node_longitude(mut self, v: Radian) -> Self {
        self.ascending_node_longitude = v;
        self
    }
    pub fn inclination(mut self, v: Radian) -> Self {
        self.inclination = Some(v);
        self
    }
    pub fn impact_param(mut self, v: f64) -> Self {
        self.impact_param = Some(v);
        self
    }
    pub fn time_transit(mut self, v: Day) -> Self {
        self.time_transit = Some(v);
        self
    }
    pub fn time_periastron(mut self, v: Day) -> Self {
        self.time_periastron = Some(v);
        self
    }
    pub fn mass(mut self, v: SolarMass) -> Self {
        self.mass = v;
        self
    }
    pub fn radius(mut self, v: SolarRadius) -> Self {
        self.radius = v;
        self
    }

    /// Resolve the element set around `central`.
    ///
    /// Validation rules
    /// -----------------
    /// * exactly one of `period` / `semi_major_axis`; `duration` requires `period`,
    ///   excludes `semi_major_axis` and `inclination`, and needs `e = 0`;
    /// * at most one of `inclination` / `impact_param`;
    /// * at most one of `time_transit` / `time_periastron`;
    /// * `0 ≤ e < 1`, `mass ≥ 0`, `radius ≥ 0`, all given lengths/times `> 0`;
    /// * the impact parameter must be reachable (`|cos i| ≤ 1`).
    ///
    /// Returns
    /// -----------------
    /// * `Ok(OrbitalElements)` or the first violated precondition.
    pub fn build(self, central: &Central) -> Result<OrbitalElements, KeplightError> {
        check_eccentricity(self.eccentricity)?;
        check_non_negative("mass", self.mass)?;
        check_non_negative("radius", self.radius)?;
        check_finite("periapsis_argument", self.periapsis_argument)?;
        check_finite("ascending_node_longitude", self.ascending_node_longitude)?;
        for (name, value) in [
            ("inclination", self.inclination),
            ("impact_param", self.impact_param),
            ("time_transit", self.time_transit),
            ("time_periastron", self.time_periastron),
        ] {
            if let Some(v) = value {
                check_finite(name, v)?;
            }
        }

        let e = self.eccentricity;
        let w = self.periapsis_argument;
        let central_mass = central.mass();
        let central_radius = central.radius();
        let total_mass = central_mass + self.mass;

        if self.inclination.is_some() && self.impact_param.is_some() {
            return Err(KeplightError::InvalidOrbitalElements(
                "give either inclination or impact_param, not both".into(),
            ));
        }
        if self.time_transit.is_some() && self.time_periastron.is_some() {
            return Err(KeplightError::InvalidOrbitalElements(
                "give either time_transit or time_periastron, not both".into(),
            ));
        }

        let (period, semi_major_axis) = match (self.period, self.semi_major_axis, self.duration) {
            (Some(_), Some(_), _) => {
                return Err(KeplightError::InvalidOrbitalElements(
                    "give either period or semi_major_axis, not both".into(),
                ))
            }
            (Some(p), None, None) => {
                check_positive("period", p)?;
                let a = (G_GRAV * total_mass * p * p / (DPI * DPI)).cbrt();
                (p, a)
            }
            (Some(p), None, Some(duration)) => {
                check_positive("period", p)?;
                check_positive("duration", duration)?;
                if e != 0.0 {
                    return Err(KeplightError::InvalidOrbitalElements(
                        "duration parameterization requires a circular orbit".into(),
                    ));
                }
                if self.inclination.is_some() {
                    return Err(KeplightError::InvalidOrbitalElements(
                        "duration parameterization takes impact_param, not inclination".into(),
                    ));
                }
                if duration >= 0.5 * p {
                    return Err(KeplightError::InvalidOrbitalElements(format!(
                        "duration must be shorter than half the period, got {duration}"
                    )));
                }
                let b = self.impact_param.unwrap_or(0.0);
                let k = self.radius / central_radius;
                let (sin_phi, cos_phi) = (PI * duration / p).sin_cos();
                let chord = (1.0 + k).powi(2) - b * b * cos_phi * cos_phi;
                if b.abs() >= 1.0 + k || chord <= 0.0 {
                    return Err(KeplightError::InvalidOrbitalElements(format!(
                        "impact parameter {b} never transits, duration is undefined"
                    )));
                }
                (p, central_radius * chord.sqrt() / sin_phi)
            }
            (None, Some(a), None) => {
                check_positive("semi_major_axis", a)?;
                let p = DPI * (a.powi(3) / (G_GRAV * total_mass)).sqrt();
                (p, a)
            }
            (None, Some(_), Some(_)) => {
                return Err(KeplightError::InvalidOrbitalElements(
                    "duration and semi_major_axis are mutually exclusive".into(),
                ))
            }
            (None, None, _) => {
                return Err(KeplightError::InvalidOrbitalElements(
                    "either period or semi_major_axis is required".into(),
                ))
            }
        };

        let inclination = match (self.inclination, self.impact_param) {
            (Some(i), _) => i,
            (None, b) => {
                let b = b.unwrap_or(0.0);
                let cos_i =
                    b * central_radius * (1.0 + e * w.sin()) / (semi_major_axis * (1.0 - e * e));
                if !(cos_i.abs() <= 1.0) {
                    return Err(KeplightError::InvalidOrbitalElements(format!(
                        "impact parameter {b} is unreachable for this orbit"
                    )));
                }
                cos_i.acos()
            }
        };

        let mean_motion = DPI / period;
        let transit_offset = transit_mean_anomaly(e, w) / mean_motion;
        let (time_transit, time_periastron) = match (self.time_transit, self.time_periastron) {
            (_, Some(tp)) => (tp + transit_offset, tp),
            (t0, None) => {
                let t0 = t0.unwrap_or(0.0);
                (t0, t0 - transit_offset)
            }
        };

        Ok(OrbitalElements {
            period,
            semi_major_axis,
            eccentricity: e,
            inclination,
            periapsis_argument: w,
            ascending_node_longitude: self.ascending_node_longitude,
            time_transit,
            time_periastron,
            central_mass,
            central_radius,
            mass: self.mass,
            radius: self.radius,
            rotation: orbit_rotation(self.ascending_node_longitude, inclination, w),
        })
    }
}

impl fmt::Display for OrbitalElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Keplerian elements")?;
        writeln!(f, "------------------")?;
        writeln!(f, "  P   (period)            = {:.9} d", self.period)?;
        writeln!(f, "  a   (semi-major axis)   = {:.6} R☉", self.semi_major_axis)?;
        writeln!(f, "  e   (eccentricity)      = {:.6}", self.eccentricity)?;
        writeln!(f, "  i   (inclination)       = {:.6} rad", self.inclination)?;
        writeln!(f, "  ω   (arg. periapsis)    = {:.6} rad", self.periapsis_argument)?;
        writeln!(f, "  Ω   (ascending node)    = {:.6} rad", self.ascending_node_longitude)?;
        writeln!(f, "  t₀  (time of transit)   = {:.6} d", self.time_transit)?;
        writeln!(f, "  t_p (time of periapsis) = {:.6} d", self.time_periastron)?;
        write!(
            f,
            "  M★ = {:.4} M☉, m = {:.3e} M☉, R★ = {:.4} R☉, r = {:.4} R☉",
            self.central_mass, self.mass, self.central_radius, self.radius
        )
    }
}
