//! # Bodies and systems
//!
//! A [`System`] is one [`Central`] body plus an ordered list of companion
//! [`Body`] values sharing the same time axis. Everything here is a value
//! object: updates go through `with_*` methods returning new instances.
//!
//! ## Emission
//!
//! Every body carries an emission **amplitude** (its unocculted flux in units
//! of the light-curve baseline), a limb-darkening law and, optionally, a
//! spherical-harmonic [`Surface`]. The central body defaults to amplitude `1`
//! with a uniform disk, companions default to amplitude `0` (dark occultors).
//!
//! ## Example
//!
//! ```rust, no_run
//! use keplight::occultation::limb_dark::LimbDarkening;
//! use keplight::orbit_type::OrbitalElements;
//! use keplight::system::{Body, Central, System};
//!
//! let star = Central::new(1.0, 1.0)
//!     .unwrap()
//!     .with_limb_darkening(LimbDarkening::quadratic(0.1, 0.06).unwrap());
//! let planet = OrbitalElements::builder()
//!     .period(3.0)
//!     .radius(0.1)
//!     .build(&star)
//!     .unwrap();
//! let system = System::new(star).add_body(Body::new(planet));
//! assert_eq!(system.len(), 1);
//! ```
use crate::{
    kepler::KeplerSolver,
    keplight_errors::KeplightError,
    occultation::limb_dark::LimbDarkening,
    orbit_type::{OrbitalElements, Trajectory},
    starry::surface::Surface,
};

/// The body every companion orbits around.
#[derive(Debug, Clone, PartialEq)]
pub struct Central {
    mass: f64,
    radius: f64,
    limb_darkening: LimbDarkening,
    amplitude: f64,
    surface: Option<Surface>,
}

impl Central {
    /// Create a central body.
    ///
    /// Arguments
    /// -----------------
    /// * `mass`: mass in solar masses, must be `> 0`.
    /// * `radius`: radius in solar radii, must be `> 0`.
    ///
    /// Return
    /// ----------
    /// * A uniform disk of amplitude `1`, or [`KeplightError::InvalidBody`].
    pub fn new(mass: f64, radius: f64) -> Result<Self, KeplightError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(KeplightError::InvalidBody(format!(
                "central mass must be > 0, got {mass}"
            )));
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(KeplightError::InvalidBody(format!(
                "central radius must be > 0, got {radius}"
            )));
        }
        Ok(Self {
            mass,
            radius,
            limb_darkening: LimbDarkening::uniform(),
            amplitude: 1.0,
            surface: None,
        })
    }

    pub fn with_limb_darkening(mut self, limb_darkening: LimbDarkening) -> Self {
        self.limb_darkening = limb_darkening;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }
    pub fn radius(&self) -> f64 {
        self.radius
    }
    pub fn limb_darkening(&self) -> &LimbDarkening {
        &self.limb_darkening
    }
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }
}

/// A companion on a Keplerian orbit around the [`Central`] body.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    elements: OrbitalElements,
    limb_darkening: LimbDarkening,
    amplitude: f64,
    surface: Option<Surface>,
}

impl Body {
    /// Dark companion following `elements`.
    pub fn new(elements: OrbitalElements) -> Self {
        Self {
            elements,
            limb_darkening: LimbDarkening::uniform(),
            amplitude: 0.0,
            surface: None,
        }
    }

    pub fn with_limb_darkening(mut self, limb_darkening: LimbDarkening) -> Self {
        self.limb_darkening = limb_darkening;
        self
    }

    /// Unocculted flux of the companion, in units of the light-curve baseline.
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_elements(mut self, elements: OrbitalElements) -> Self {
        self.elements = elements;
        self
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }
    pub fn radius(&self) -> f64 {
        self.elements.radius()
    }
    pub fn mass(&self) -> f64 {
        self.elements.mass()
    }
    pub fn limb_darkening(&self) -> &LimbDarkening {
        &self.limb_darkening
    }
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }
}

/// One central body plus its ordered companions.
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    central: Central,
    bodies: Vec<Body>,
}

impl System {
    pub fn new(central: Central) -> Self {
        Self {
            central,
            bodies: Vec::new(),
        }
    }

    pub fn central(&self) -> &Central {
        &self.central
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, index: usize) -> Result<&Body, KeplightError> {
        self.bodies
            .get(index)
            .ok_or(KeplightError::BodyIndexOutOfRange(index))
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// New system with `body` appended.
    ///
    /// The body orbit is moved around this system's central body if it was
    /// built against a different one.
    pub fn add_body(&self, body: Body) -> Self {
        let mut bodies = self.bodies.clone();
        bodies.push(self.attach(body));
        Self {
            central: self.central.clone(),
            bodies,
        }
    }

    /// New system with the companion at `index` replaced by `body`.
    pub fn with_body(&self, index: usize, body: Body) -> Result<Self, KeplightError> {
        if index >= self.bodies.len() {
            return Err(KeplightError::BodyIndexOutOfRange(index));
        }
        let mut bodies = self.bodies.clone();
        bodies[index] = self.attach(body);
        Ok(Self {
            central: self.central.clone(),
            bodies,
        })
    }

    /// New system with the companion at `index` removed.
    pub fn without_body(&self, index: usize) -> Result<Self, KeplightError> {
        if index >= self.bodies.len() {
            return Err(KeplightError::BodyIndexOutOfRange(index));
        }
        let mut bodies = self.bodies.clone();
        bodies.remove(index);
        Ok(Self {
            central: self.central.clone(),
            bodies,
        })
    }

    /// New system around a different central body.
    ///
    /// Every orbit keeps its period, orientation and transit time; see
    /// [`OrbitalElements::recentered`].
    pub fn with_central(&self, central: Central) -> Self {
        let bodies = self
            .bodies
            .iter()
            .map(|body| {
                let elements = body.elements.recentered(&central);
                body.clone().with_elements(elements)
            })
            .collect();
        Self { central, bodies }
    }

    fn attach(&self, body: Body) -> Body {
        let elements = body.elements();
        if elements.central_mass() == self.central.mass
            && elements.central_radius() == self.central.radius
        {
            body
        } else {
            let elements = elements.recentered(&self.central);
            body.with_elements(elements)
        }
    }

    /// Radial velocity of the central body (m/s), summed over all companions.
    pub fn radial_velocity(&self, times: &[f64], solver: &KeplerSolver) -> Vec<f64> {
        times
            .iter()
            .map(|&t| {
                self.bodies
                    .iter()
                    .map(|body| body.elements.radial_velocity(t, solver))
                    .sum()
            })
            .collect()
    }

    /// Position of every companion relative to the central body, one trajectory per companion.
    pub fn relative_trajectories(&self, times: &[f64], solver: &KeplerSolver) -> Vec<Trajectory> {
        self.bodies
            .iter()
            .map(|body| body.elements.relative_trajectory(times, solver).0)
            .collect()
    }
}

#[cfg(test)]
mod system_test {
    use super::*;
    use approx::assert_relative_eq;

    fn planet(star: &Central, period: f64, mass: f64) -> Body {
        Body::new(
            OrbitalElements::builder()
                .period(period)
                .impact_param(0.3)
                .mass(mass)
                .radius(0.05)
                .build(star)
                .unwrap(),
        )
    }

    #[test]
    fn test_central_validation() {
        assert!(Central::new(0.0, 1.0).is_err());
        assert!(Central::new(1.0, -1.0).is_err());
        assert!(Central::new(f64::NAN, 1.0).is_err());
        let star = Central::new(1.0, 1.0).unwrap();
        assert_eq!(star.amplitude(), 1.0);
        assert!(star.surface().is_none());
    }

    #[test]
    fn test_functional_update() {
        let star = Central::new(1.0, 1.0).unwrap();
        let system = System::new(star.clone())
            .add_body(planet(&star, 3.0, 1e-3))
            .add_body(planet(&star, 7.0, 2e-3));
        assert_eq!(system.len(), 2);

        let updated = system.with_body(0, planet(&star, 4.0, 1e-3)).unwrap();
        assert_eq!(system.body(0).unwrap().elements().period(), 3.0);
        assert_eq!(updated.body(0).unwrap().elements().period(), 4.0);

        assert_eq!(
            system.with_body(5, planet(&star, 4.0, 1e-3)).unwrap_err(),
            KeplightError::BodyIndexOutOfRange(5)
        );
        assert_eq!(system.without_body(1).unwrap().len(), 1);
        assert!(system.body(2).is_err());
    }

    #[test]
    fn test_with_central_rescales_orbits() {
        let star = Central::new(1.0, 1.0).unwrap();
        let system = System::new(star.clone()).add_body(planet(&star, 3.0, 0.0));
        let heavier = system.with_central(Central::new(8.0, 2.0).unwrap());
        let before = system.body(0).unwrap().elements();
        let after = heavier.body(0).unwrap().elements();
        assert_eq!(after.period(), before.period());
        assert_relative_eq!(
            after.semi_major_axis(),
            2.0 * before.semi_major_axis(),
            max_relative = 1e-12
        );
        assert_eq!(after.central_radius(), 2.0);
    }

    #[test]
    fn test_radial_velocity_is_additive() {
        let star = Central::new(1.0, 1.0).unwrap();
        let a = planet(&star, 3.0, 1e-3);
        let b = planet(&star, 7.0, 2e-3);
        let solver = KeplerSolver::default();
        let times: Vec<f64> = (0..40).map(|i| 0.3 * i as f64).collect();

        let both = System::new(star.clone())
            .add_body(a.clone())
            .add_body(b.clone())
            .radial_velocity(&times, &solver);
        let only_a = System::new(star.clone()).add_body(a).radial_velocity(&times, &solver);
        let only_b = System::new(star).add_body(b).radial_velocity(&times, &solver);

        for i in 0..times.len() {
            assert_relative_eq!(both[i], only_a[i] + only_b[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_test_particle_has_no_reflex_motion() {
        let star = Central::new(1.0, 1.0).unwrap();
        let system = System::new(star.clone()).add_body(planet(&star, 3.0, 0.0));
        let rv = system.radial_velocity(&[0.0, 0.4, 1.1], &KeplerSolver::default());
        assert!(rv.iter().all(|v| *v == 0.0));
    }
}
