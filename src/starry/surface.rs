//! # Surface maps
//!
//! [`SurfaceMap`] is an immutable vector of real spherical-harmonic
//! coefficients (see [`crate::starry::ylm`] for the ordering and
//! normalization). [`Surface`] pairs a map with the orientation of the body:
//!
//! - `inclination` – angle between the rotation pole and the line of sight
//!   (`π/2`, the default, puts the pole in the sky plane, toward `+y`);
//! - `obliquity` – rotation of the pole in the sky plane, counter-clockwise from `+y`;
//! - `rotation_period` / `phase` – spin angle `α(t) = phase + 2π t / P_rot`
//!   about the pole (`None` for a body that does not spin).
//!
//! The observer-frame map at time `t` is `D(obl, inc) · Z(α(t)) · y`.
use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{DVector, Rotation3, Vector3};

use crate::{
    constants::DPI,
    keplight_errors::KeplightError,
    starry::{
        rotation::{spin_coefficients, RotationOperator},
        ylm::{basis_size, ylm_index},
    },
};

/// Spherical-harmonic coefficients up to `l_max`.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMap {
    l_max: usize,
    coefficients: DVector<f64>,
}

impl SurfaceMap {
    /// Arguments
    /// -----------------
    /// * `coefficients`: `(l_max + 1)²` finite values ordered `(0,0), (1,−1), (1,0), (1,1), …`.
    pub fn new(coefficients: Vec<f64>) -> Result<Self, KeplightError> {
        let len = coefficients.len();
        let degrees = (len as f64).sqrt().round() as usize;
        if len == 0 || degrees * degrees != len {
            return Err(KeplightError::InvalidSurfaceMap(format!(
                "{len} coefficients is not a (l_max + 1)² length"
            )));
        }
        if let Some(bad) = coefficients.iter().find(|c| !c.is_finite()) {
            return Err(KeplightError::InvalidSurfaceMap(format!(
                "coefficient {bad} is not finite"
            )));
        }
        Ok(Self {
            l_max: degrees - 1,
            coefficients: DVector::from_vec(coefficients),
        })
    }

    /// Uniform map: `Y₀₀` only, unit coefficient.
    pub fn uniform(l_max: usize) -> Self {
        let mut coefficients = DVector::zeros(basis_size(l_max));
        coefficients[0] = 1.0;
        Self {
            l_max,
            coefficients,
        }
    }

    pub(crate) fn from_vector(coefficients: DVector<f64>) -> Self {
        let l_max = (coefficients.len() as f64).sqrt().round() as usize - 1;
        Self {
            l_max,
            coefficients,
        }
    }

    pub fn l_max(&self) -> usize {
        self.l_max
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }

    /// Coefficient of `Y_lm`, `None` outside the map.
    pub fn get(&self, l: usize, m: i64) -> Option<f64> {
        if l > self.l_max || m.unsigned_abs() as usize > l {
            return None;
        }
        Some(self.coefficients[ylm_index(l, m)])
    }

    /// Copy of the map with `Y_lm` set to `value`.
    pub fn with(&self, l: usize, m: i64, value: f64) -> Result<Self, KeplightError> {
        if l > self.l_max || m.unsigned_abs() as usize > l {
            return Err(KeplightError::InvalidSurfaceMap(format!(
                "(l, m) = ({l}, {m}) is outside a map of degree {}",
                self.l_max
            )));
        }
        if !value.is_finite() {
            return Err(KeplightError::InvalidSurfaceMap(format!(
                "coefficient {value} is not finite"
            )));
        }
        let mut updated = self.clone();
        updated.coefficients[ylm_index(l, m)] = value;
        Ok(updated)
    }

    /// Same map padded with zeros up to degree `l_max` (no-op if already larger).
    pub fn padded(&self, l_max: usize) -> Self {
        if l_max <= self.l_max {
            return self.clone();
        }
        let mut coefficients = DVector::zeros(basis_size(l_max));
        coefficients
            .rows_mut(0, self.coefficients.len())
            .copy_from(&self.coefficients);
        Self {
            l_max,
            coefficients,
        }
    }

    /// Brightness integrated over the whole sphere, `∮ I dΩ = 2√π · y₀₀`.
    ///
    /// Every `l > 0` harmonic integrates to zero by orthogonality with `Y₀₀`.
    pub fn total_flux(&self) -> f64 {
        2.0 * PI.sqrt() * self.coefficients[0]
    }

    /// Map rotated by `operator`.
    pub fn rotated(&self, operator: &RotationOperator) -> Self {
        Self::from_vector(operator.apply(&self.coefficients))
    }

    /// Map spun by `angle` about its pole.
    pub fn spun(&self, angle: f64) -> Self {
        Self::from_vector(spin_coefficients(&self.coefficients, angle))
    }
}

/// A map with its orientation and spin state.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    map: SurfaceMap,
    inclination: f64,
    obliquity: f64,
    rotation_period: Option<f64>,
    phase: f64,
}

impl Surface {
    /// Non-spinning surface with the pole in the sky plane.
    pub fn new(map: SurfaceMap) -> Self {
        Self {
            map,
            inclination: FRAC_PI_2,
            obliquity: 0.0,
            rotation_period: None,
            phase: 0.0,
        }
    }

    pub fn with_inclination(mut self, inclination: f64) -> Self {
        self.inclination = inclination;
        self
    }

    pub fn with_obliquity(mut self, obliquity: f64) -> Self {
        self.obliquity = obliquity;
        self
    }

    /// Spin with period `period` (days), which must be `> 0`.
    pub fn with_rotation_period(mut self, period: f64) -> Result<Self, KeplightError> {
        if !(period.is_finite() && period > 0.0) {
            return Err(KeplightError::InvalidSurfaceMap(format!(
                "rotation period must be > 0, got {period}"
            )));
        }
        self.rotation_period = Some(period);
        Ok(self)
    }

    /// Spin angle at `t = 0`.
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    pub fn map(&self) -> &SurfaceMap {
        &self.map
    }
    pub fn inclination(&self) -> f64 {
        self.inclination
    }
    pub fn obliquity(&self) -> f64 {
        self.obliquity
    }
    pub fn rotation_period(&self) -> Option<f64> {
        self.rotation_period
    }
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Spin angle `α(t)` about the pole.
    pub fn spin_angle(&self, t: f64) -> f64 {
        match self.rotation_period {
            Some(period) => self.phase + DPI * t / period,
            None => self.phase,
        }
    }

    /// Body frame → observer frame rotation `R_z(obliquity) · R_x(−inclination)`.
    pub fn orientation(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), self.obliquity)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), -self.inclination)
    }
}

#[cfg(test)]
mod surface_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_map_validation() {
        assert!(SurfaceMap::new(vec![]).is_err());
        assert!(SurfaceMap::new(vec![1.0, 0.0]).is_err());
        assert!(SurfaceMap::new(vec![1.0, 0.0, f64::NAN, 0.0]).is_err());
        let map = SurfaceMap::new(vec![1.0, 0.1, 0.2, 0.3]).unwrap();
        assert_eq!(map.l_max(), 1);
        assert_eq!(map.get(1, 0), Some(0.2));
        assert_eq!(map.get(2, 0), None);
        assert_eq!(map.get(1, -2), None);
        assert_eq!(SurfaceMap::new(vec![2.0]).unwrap().l_max(), 0);
    }

    #[test]
    fn test_functional_update() {
        let map = SurfaceMap::uniform(2);
        let spotted = map.with(2, -1, 0.4).unwrap();
        assert_eq!(map.get(2, -1), Some(0.0));
        assert_eq!(spotted.get(2, -1), Some(0.4));
        assert!(map.with(3, 0, 1.0).is_err());
        assert!(map.with(1, 0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_total_flux_only_depends_on_y00() {
        let base = SurfaceMap::uniform(3);
        let varied = base.with(1, 0, 0.7).unwrap().with(3, -2, -0.3).unwrap();
        assert_eq!(base.total_flux(), varied.total_flux());
        assert_abs_diff_eq!(base.total_flux(), 2.0 * PI.sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn test_padding() {
        let map = SurfaceMap::new(vec![1.0, 0.1, 0.2, 0.3]).unwrap();
        let padded = map.padded(3);
        assert_eq!(padded.l_max(), 3);
        assert_eq!(padded.coefficients().len(), 16);
        assert_eq!(padded.get(1, 1), Some(0.3));
        assert_eq!(padded.get(3, 3), Some(0.0));
    }

    #[test]
    fn test_spin_angle() {
        let surface = Surface::new(SurfaceMap::uniform(1))
            .with_phase(0.5)
            .with_rotation_period(2.0)
            .unwrap();
        assert_abs_diff_eq!(surface.spin_angle(1.0), 0.5 + PI, epsilon = 1e-15);
        let still = Surface::new(SurfaceMap::uniform(1)).with_phase(0.5);
        assert_eq!(still.spin_angle(123.0), 0.5);
        assert!(Surface::new(SurfaceMap::uniform(1))
            .with_rotation_period(0.0)
            .is_err());
    }

    #[test]
    fn test_orientation_points_pole_up() {
        let pole = Surface::new(SurfaceMap::uniform(1)).orientation() * Vector3::z();
        assert_abs_diff_eq!(pole, Vector3::y(), epsilon = 1e-15);
        let face_on = Surface::new(SurfaceMap::uniform(1))
            .with_inclination(0.0)
            .orientation()
            * Vector3::z();
        assert_abs_diff_eq!(face_on, Vector3::z(), epsilon = 1e-15);
    }
}
