//! # Kepler equation solver
//!
//! Solves `E − e·sin(E) = M` for the eccentric anomaly `E` of a bound orbit
//! (`0 ≤ e < 1`) with a **fixed number of refinement steps**. There is no
//! convergence gate: every call performs exactly [`KeplerSolver::iterations`]
//! updates, so the computation graph is static and the same instruction stream
//! is executed for every time sample of a batch.
//!
//! ## Algorithm
//!
//! 1. Reduce `M` to `[-π, π)` and solve on `|M|` (the equation is odd in `M`).
//! 2. Start from Danby's guess `E₀ = |M| + 0.85·e`.
//! 3. Apply third-order Householder corrections (Danby's quartic scheme):
//!
//!    ```text
//!    δ₁ = −f / f'
//!    δ₂ = −f / (f' + δ₁ f''/2)
//!    δ₃ = −f / (f' + δ₂ f''/2 + δ₂² f'''/6)
//!    ```
//!
//!    with `f' = 1 − e cos E ≥ 1 − e > 0`, so no step divides by zero.
//! 4. Restore the sign and the revolution count of the input mean anomaly.
//!
//! The default of 10 steps reaches machine precision for every `e < 1`.
//!
//! ## Differentiability
//!
//! `E(M, e)` is smooth. The `rem_euclid` reduction of step 1 jumps by `2π`
//! between revolutions and the `|M|` fold switches sign at `M = 0`. Step 4
//! undoes both exactly, so only intermediate values are discontinuous:
//! differentiate through [`KeplerSolution::partials`], not through the steps.
//!
//! ## See also
//!
//! * [`KeplerSolution::partials`] – derivatives `∂E/∂M`, `∂E/∂e` for gradient consumers.
//! * [`crate::orbit_type::keplerian_element::OrbitalElements`] – validates `e` before solving.
use std::f64::consts::PI;

use super::constants::DPI;

/// Default number of fixed Householder steps.
pub const DEFAULT_KEPLER_ITERATIONS: usize = 10;

/// Return the principal value of an angle in `[0, 2π)`.
pub fn principal_angle(a: f64) -> f64 {
    a.rem_euclid(DPI)
}

/// Return the principal difference between two angles in `[-π, π]`.
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let mut diff = principal_angle(a) - principal_angle(b);

    if diff > PI {
        diff -= DPI;
    } else if diff < -PI {
        diff += DPI;
    }

    diff
}

/// Reduce an angle to `[-π, π)`.
#[inline]
fn reduce_symmetric(a: f64) -> f64 {
    (a + PI).rem_euclid(DPI) - PI
}

/// Anomalies of one time sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    pub mean_anomaly: f64,
    pub eccentricity: f64,
    pub eccentric_anomaly: f64,
    pub sin_eccentric_anomaly: f64,
    pub cos_eccentric_anomaly: f64,
    pub true_anomaly: f64,
}

impl KeplerSolution {
    /// Residual `E − e·sin(E) − M` of the solution.
    pub fn residual(&self) -> f64 {
        self.eccentric_anomaly - self.eccentricity * self.sin_eccentric_anomaly - self.mean_anomaly
    }

    /// Implicit-function derivatives of the eccentric anomaly.
    ///
    /// Return
    /// ----------
    /// * `(∂E/∂M, ∂E/∂e)` = `(1/(1 − e cos E), sin E/(1 − e cos E))`.
    pub fn partials(&self) -> (f64, f64) {
        let denom = 1.0 - self.eccentricity * self.cos_eccentric_anomaly;
        (1.0 / denom, self.sin_eccentric_anomaly / denom)
    }
}

/// Fixed-iteration Kepler solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeplerSolver {
    iterations: usize,
}

impl Default for KeplerSolver {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KEPLER_ITERATIONS,
        }
    }
}

impl KeplerSolver {
    /// Build a solver performing exactly `iterations` refinement steps (at least one).
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Eccentric anomaly `E` for mean anomaly `M`, on the same revolution as `M`.
    ///
    /// Arguments
    /// -----------------
    /// * `mean_anomaly`: `M` in radians, any real value.
    /// * `eccentricity`: `e ∈ [0, 1)`; the caller is responsible for the range check.
    pub fn eccentric_anomaly(&self, mean_anomaly: f64, eccentricity: f64) -> f64 {
        debug_assert!((0.0..1.0).contains(&eccentricity));

        let reduced = reduce_symmetric(mean_anomaly);
        let sign = if reduced < 0.0 { -1.0 } else { 1.0 };
        let m = reduced.abs();

        let mut ecc_anom = m + 0.85 * eccentricity;
        for _ in 0..self.iterations {
            let (sin_e, cos_e) = ecc_anom.sin_cos();
            let f0 = ecc_anom - eccentricity * sin_e - m;
            let f1 = 1.0 - eccentricity * cos_e;
            let f2 = eccentricity * sin_e;
            let f3 = eccentricity * cos_e;

            let d1 = -f0 / f1;
            let d2 = -f0 / (f1 + 0.5 * d1 * f2);
            let d3 = -f0 / (f1 + 0.5 * d2 * f2 + d2 * d2 * f3 / 6.0);
            ecc_anom += d3;
        }

        sign * ecc_anom + (mean_anomaly - reduced)
    }

    /// Solve Kepler's equation and derive the true anomaly.
    pub fn solve(&self, mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
        let eccentric_anomaly = self.eccentric_anomaly(mean_anomaly, eccentricity);
        let (sin_e, cos_e) = eccentric_anomaly.sin_cos();
        let (sin_half, cos_half) = (0.5 * eccentric_anomaly).sin_cos();
        let true_anomaly = 2.0
            * ((1.0 + eccentricity).sqrt() * sin_half)
                .atan2((1.0 - eccentricity).sqrt() * cos_half);

        KeplerSolution {
            mean_anomaly,
            eccentricity,
            eccentric_anomaly,
            sin_eccentric_anomaly: sin_e,
            cos_eccentric_anomaly: cos_e,
            true_anomaly,
        }
    }
}

/// Mean anomaly reached at true anomaly `f` (inverse of [`KeplerSolver::solve`]).
pub fn mean_anomaly_from_true(true_anomaly: f64, eccentricity: f64) -> f64 {
    let (sin_half, cos_half) = (0.5 * true_anomaly).sin_cos();
    let ecc_anom = 2.0
        * ((1.0 - eccentricity).sqrt() * sin_half).atan2((1.0 + eccentricity).sqrt() * cos_half);
    ecc_anom - eccentricity * ecc_anom.sin()
}

#[cfg(test)]
mod kepler_test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_principal_angle() {
        assert_abs_diff_eq!(principal_angle(-0.5), DPI - 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(principal_angle(7.0), 7.0 - DPI, epsilon = 1e-15);
        assert_abs_diff_eq!(angle_diff(0.1, DPI - 0.1), 0.2, epsilon = 1e-14);
    }

    #[test]
    fn test_residual_grid() {
        let solver = KeplerSolver::default();
        for &e in &[0.0, 0.01, 0.1, 0.3, 0.5, 0.7, 0.9, 0.95, 0.99, 0.999] {
            for k in -40..=40 {
                let m = 0.37 * k as f64;
                let sol = solver.solve(m, e);
                assert!(
                    sol.residual().abs() < 1e-10,
                    "e={e} M={m} residual={}",
                    sol.residual()
                );
            }
        }
    }

    #[test]
    fn test_residual_random() {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let solver = KeplerSolver::default();
        for _ in 0..5000 {
            let e = rng.random_range(0.0..0.999);
            let m = rng.random_range(-50.0..50.0);
            let sol = solver.solve(m, e);
            assert!(sol.residual().abs() < 1e-10, "e={e} M={m}");
        }
    }

    #[test]
    fn test_circular_orbit_is_identity() {
        let solver = KeplerSolver::default();
        for k in 0..20 {
            let m = -3.0 + 0.4 * k as f64;
            let sol = solver.solve(m, 0.0);
            assert_abs_diff_eq!(sol.eccentric_anomaly, m, epsilon = 1e-14);
            assert_abs_diff_eq!(
                reduce_symmetric(sol.true_anomaly),
                reduce_symmetric(m),
                epsilon = 1e-13
            );
        }
    }

    #[test]
    fn test_same_revolution() {
        let solver = KeplerSolver::default();
        let m = 5.0 * DPI + 1.0;
        let ecc_anom = solver.eccentric_anomaly(m, 0.4);
        assert!((ecc_anom - m).abs() < 1.0);
    }

    #[test]
    fn test_true_anomaly_round_trip() {
        let solver = KeplerSolver::default();
        let sol = solver.solve(1.234, 0.6);
        let m = mean_anomaly_from_true(sol.true_anomaly, 0.6);
        assert_abs_diff_eq!(m, 1.234, epsilon = 1e-12);
    }

    #[test]
    fn test_partials_match_finite_differences() {
        let solver = KeplerSolver::default();
        let (m, e, h) = (0.8, 0.45, 1e-6);
        let (de_dm, de_de) = solver.solve(m, e).partials();

        let fd_m = (solver.eccentric_anomaly(m + h, e) - solver.eccentric_anomaly(m - h, e))
            / (2.0 * h);
        let fd_e = (solver.eccentric_anomaly(m, e + h) - solver.eccentric_anomaly(m, e - h))
            / (2.0 * h);

        assert_abs_diff_eq!(de_dm, fd_m, epsilon = 1e-8);
        assert_abs_diff_eq!(de_de, fd_e, epsilon = 1e-8);
    }
}
