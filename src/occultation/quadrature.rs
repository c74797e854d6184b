//! # Quadrature helpers
//!
//! * [`GaussLegendre`] – node/weight tables for `n`-point Gauss–Legendre rules,
//!   computed once and reused for every time sample.
//! * [`trig_power_integral`] – closed-form `∫ cosᵖφ sinᵠφ dφ` by the classic
//!   reduction formulas, used by the Green's-theorem line integrals.
use tracing::debug;

use crate::keplight_errors::KeplightError;

const NEWTON_TOLERANCE: f64 = 1e-14;
const MAX_NEWTON_STEPS: usize = 100;

/// Gauss–Legendre rule on `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Build the `order`-point rule.
    ///
    /// The roots of `P_n` are refined by Newton's method on the three-term
    /// Legendre recurrence, starting from `cos(π(i + 3/4)/(n + 1/2))`.
    ///
    /// Return
    /// ----------
    /// * The rule, or [`KeplightError::InvalidQuadratureOrder`] when `order == 0`.
    pub fn new(order: usize) -> Result<Self, KeplightError> {
        if order == 0 {
            return Err(KeplightError::InvalidQuadratureOrder(order));
        }

        let n = order as f64;
        let mut nodes = Vec::with_capacity(order);
        let mut weights = Vec::with_capacity(order);

        for i in 0..order {
            let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n + 0.5)).cos();
            for _ in 0..MAX_NEWTON_STEPS {
                let (p, dp) = legendre_with_derivative(order, x);
                let dx = p / dp;
                x -= dx;
                if dx.abs() < NEWTON_TOLERANCE {
                    break;
                }
            }
            let derivative = legendre_with_derivative(order, x).1;
            nodes.push(x);
            weights.push(2.0 / ((1.0 - x * x) * derivative * derivative));
        }

        debug!(order, "Gauss-Legendre table built");
        Ok(Self { nodes, weights })
    }

    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Approximate `∫ₐᵇ f(x) dx`.
    pub fn integrate<F>(&self, a: f64, b: f64, mut f: F) -> f64
    where
        F: FnMut(f64) -> f64,
    {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (b + a);
        half * self
            .nodes
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| w * f(mid + half * x))
            .sum::<f64>()
    }
}

/// `(P_n(x), P_n'(x))` from the three-term recurrence.
fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p_prev = 0.0;
    let mut p = 1.0;
    for j in 0..n {
        let jf = j as f64;
        let p_next = ((2.0 * jf + 1.0) * x * p - jf * p_prev) / (jf + 1.0);
        p_prev = p;
        p = p_next;
    }
    let derivative = n as f64 * (x * p - p_prev) / (x * x - 1.0);
    (p, derivative)
}

/// `∫ₐᵇ cosᵖφ · sinᵠφ dφ`, exact.
///
/// Arguments
/// -----------------
/// * `p`, `q`: non-negative powers.
/// * `a`, `b`: integration bounds in radians.
pub fn trig_power_integral(p: u32, q: u32, a: f64, b: f64) -> f64 {
    let (sa, ca) = a.sin_cos();
    let (sb, cb) = b.sin_cos();
    trig_power_recursive(p, q, (ca, sa), (cb, sb), b - a)
}

fn trig_power_recursive(p: u32, q: u32, lo: (f64, f64), hi: (f64, f64), span: f64) -> f64 {
    let bracket = |pc: u32, ps: u32| {
        hi.0.powi(pc as i32) * hi.1.powi(ps as i32) - lo.0.powi(pc as i32) * lo.1.powi(ps as i32)
    };
    match (p, q) {
        (0, 0) => span,
        (1, 0) => hi.1 - lo.1,
        (0, 1) => lo.0 - hi.0,
        (1, 1) => 0.5 * (hi.1 * hi.1 - lo.1 * lo.1),
        (p, q) if p >= 2 => {
            let pq = (p + q) as f64;
            bracket(p - 1, q + 1) / pq
                + (p - 1) as f64 / pq * trig_power_recursive(p - 2, q, lo, hi, span)
        }
        (p, q) => {
            let pq = (p + q) as f64;
            -bracket(p + 1, q - 1) / pq
                + (q - 1) as f64 / pq * trig_power_recursive(p, q - 2, lo, hi, span)
        }
    }
}

#[cfg(test)]
mod quadrature_test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_invalid_order() {
        assert_eq!(
            GaussLegendre::new(0).unwrap_err(),
            KeplightError::InvalidQuadratureOrder(0)
        );
    }

    #[test]
    fn test_weights_sum_to_two() {
        for order in [1, 2, 5, 10, 64, 500, 1500] {
            let rule = GaussLegendre::new(order).unwrap();
            let sum: f64 = rule.weights().iter().sum();
            assert_abs_diff_eq!(sum, 2.0, epsilon = 1e-11);
            assert!(rule.nodes().iter().all(|x| x.abs() < 1.0));
        }
    }

    #[test]
    fn test_exact_for_polynomials() {
        // an n-point rule integrates degree 2n − 1 exactly
        for order in 1..8 {
            let rule = GaussLegendre::new(order).unwrap();
            let degree = 2 * order as i32 - 1;
            let integral = rule.integrate(-0.5, 2.0, |x| x.powi(degree) + 1.0);
            let expected = (2.0_f64.powi(degree + 1) - (-0.5_f64).powi(degree + 1))
                / (degree + 1) as f64
                + 2.5;
            assert_abs_diff_eq!(integral, expected, epsilon = 1e-12 * expected.abs().max(1.0));
        }
    }

    #[test]
    fn test_smooth_integrand() {
        let rule = GaussLegendre::new(20).unwrap();
        assert_abs_diff_eq!(rule.integrate(0.0, PI, f64::sin), 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_trig_power_integral_matches_quadrature() {
        let rule = GaussLegendre::new(60).unwrap();
        for p in 0..7 {
            for q in 0..7 {
                let (a, b) = (-0.4, 2.3);
                let exact = trig_power_integral(p, q, a, b);
                let numeric = rule.integrate(a, b, |x| {
                    x.cos().powi(p as i32) * x.sin().powi(q as i32)
                });
                assert_abs_diff_eq!(exact, numeric, epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn test_trig_power_full_turn() {
        // ∫₀^{2π} cos⁴ = 3π/4
        assert_abs_diff_eq!(
            trig_power_integral(4, 0, 0.0, 2.0 * PI),
            0.75 * PI,
            epsilon = 1e-14
        );
        assert_abs_diff_eq!(
            trig_power_integral(3, 2, 0.0, 2.0 * PI),
            0.0,
            epsilon = 1e-14
        );
    }
}
