//! # Orbital state from elements
//!
//! Position and velocity of a companion at time `t`, relative to the central
//! body and relative to the two-body barycenter, plus the reflex radial
//! velocity of the central body.
//!
//! ## Pipeline (per time sample)
//!
//! ```text
//! M = n (t − t_p)                       mean anomaly
//! E = KeplerSolver(M, e)                eccentric anomaly (fixed iterations)
//! (x₀, y₀) = a (cos E − e, √(1−e²) sin E)
//! (ẋ₀, ẏ₀) = a n / (1 − e cos E) · (−sin E, √(1−e²) cos E)
//! observer frame = R_z(Ω) · R_x(i) · R_z(ω) · (x₀, y₀, 0)
//! ```
//!
//! Each sample is independent of every other one, so the vectorized helpers
//! ([`OrbitalElements::relative_trajectory`], [`OrbitalElements::radial_velocities`])
//! are plain maps over the input times.
//!
//! ## Units
//!
//! Positions in solar radii, velocities in solar radii per day, radial
//! velocities in m/s.
use itertools::{multiunzip, Itertools};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    constants::RSUN_PER_DAY_TO_M_PER_S,
    kepler::{KeplerSolution, KeplerSolver},
    orbit_type::keplerian_element::OrbitalElements,
};

/// Cartesian position / velocity pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl OrbitalState {
    /// Same state seen with all vectors scaled by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            position: self.position * factor,
            velocity: self.velocity * factor,
        }
    }

    /// Sky-plane separation `√(x² + y²)`.
    pub fn projected_separation(&self) -> f64 {
        self.position.x.hypot(self.position.y)
    }

    /// `true` when the body is on the observer side of the sky plane.
    pub fn in_front(&self) -> bool {
        self.position.z > 0.0
    }
}

/// Time-aligned series of 3-vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Vector3<f64>> {
        Some(Vector3::new(
            *self.x.get(idx)?,
            *self.y.get(idx)?,
            *self.z.get(idx)?,
        ))
    }
}

impl FromIterator<Vector3<f64>> for Trajectory {
    fn from_iter<I: IntoIterator<Item = Vector3<f64>>>(iter: I) -> Self {
        let (x, y, z): (Vec<f64>, Vec<f64>, Vec<f64>) =
            multiunzip(iter.into_iter().map(|v| (v.x, v.y, v.z)));
        Trajectory { x, y, z }
    }
}

impl OrbitalElements {
    /// Mean anomaly `n (t − t_p)` at time `t` (not reduced).
    pub fn mean_anomaly(&self, t: f64) -> f64 {
        self.mean_motion() * (t - self.time_periastron())
    }

    /// Solve the anomalies at time `t`.
    pub fn anomalies(&self, t: f64, solver: &KeplerSolver) -> KeplerSolution {
        solver.solve(self.mean_anomaly(t), self.eccentricity())
    }

    /// Position and velocity of the companion relative to the central body.
    pub fn relative_state(&self, t: f64, solver: &KeplerSolver) -> OrbitalState {
        let e = self.eccentricity();
        let a = self.semi_major_axis();
        let n = self.mean_motion();
        let sol = self.anomalies(t, solver);
        let (sin_e, cos_e) = (sol.sin_eccentric_anomaly, sol.cos_eccentric_anomaly);

        let sqrt_1me2 = (1.0 - e * e).sqrt();
        let in_plane_position = Vector3::new(a * (cos_e - e), a * sqrt_1me2 * sin_e, 0.0);

        let rate = a * n / (1.0 - e * cos_e);
        let in_plane_velocity = Vector3::new(-rate * sin_e, rate * sqrt_1me2 * cos_e, 0.0);

        let rotation = self.rotation();
        OrbitalState {
            position: rotation * in_plane_position,
            velocity: rotation * in_plane_velocity,
        }
    }

    /// Relative position only.
    pub fn relative_position(&self, t: f64, solver: &KeplerSolver) -> Vector3<f64> {
        self.relative_state(t, solver).position
    }

    /// States of the central body and of the companion around the two-body barycenter.
    ///
    /// Return
    /// ----------
    /// * `(central, companion)` with `central = −m/(M★+m)·rel` and
    ///   `companion = M★/(M★+m)·rel`.
    pub fn barycentric_states(&self, t: f64, solver: &KeplerSolver) -> (OrbitalState, OrbitalState) {
        let relative = self.relative_state(t, solver);
        let total = self.total_mass();
        (
            relative.scaled(-self.mass() / total),
            relative.scaled(self.central_mass() / total),
        )
    }

    /// Radial velocity of the central body in m/s (positive = receding).
    pub fn radial_velocity(&self, t: f64, solver: &KeplerSolver) -> f64 {
        let (central, _) = self.barycentric_states(t, solver);
        -central.velocity.z * RSUN_PER_DAY_TO_M_PER_S
    }

    /// Keplerian radial-velocity semi-amplitude of the central body, in m/s.
    pub fn rv_semi_amplitude(&self) -> f64 {
        let e = self.eccentricity();
        self.mass() / self.total_mass() * self.mean_motion() * self.semi_major_axis()
            * self.inclination().sin()
            / (1.0 - e * e).sqrt()
            * RSUN_PER_DAY_TO_M_PER_S
    }

    /// Relative positions and velocities over a time array.
    pub fn relative_trajectory(
        &self,
        times: &[f64],
        solver: &KeplerSolver,
    ) -> (Trajectory, Trajectory) {
        let (positions, velocities): (Vec<_>, Vec<_>) = times
            .iter()
            .map(|&t| {
                let state = self.relative_state(t, solver);
                (state.position, state.velocity)
            })
            .unzip();
        (
            positions.into_iter().collect(),
            velocities.into_iter().collect(),
        )
    }

    /// Barycentric positions of the central body and of the companion over a time array.
    pub fn barycentric_trajectories(
        &self,
        times: &[f64],
        solver: &KeplerSolver,
    ) -> (Trajectory, Trajectory) {
        let (central, companion): (Vec<_>, Vec<_>) = times
            .iter()
            .map(|&t| {
                let (c, p) = self.barycentric_states(t, solver);
                (c.position, p.position)
            })
            .unzip();
        (central.into_iter().collect(), companion.into_iter().collect())
    }

    /// Radial velocity of the central body over a time array (m/s).
    pub fn radial_velocities(&self, times: &[f64], solver: &KeplerSolver) -> Vec<f64> {
        times
            .iter()
            .map(|&t| self.radial_velocity(t, solver))
            .collect_vec()
    }
}
