//! # Complete elliptic integrals
//!
//! Bulirsch's general complete elliptic integral
//!
//! ```text
//! cel(k_c, p, a, b) = ∫₀^{π/2} (a cos²θ + b sin²θ) dθ
//!                     ─────────────────────────────────────────────
//!                     (cos²θ + p sin²θ) · √(cos²θ + k_c² sin²θ)
//! ```
//!
//! evaluated by the arithmetic-geometric mean iteration. The three classical
//! integrals are special cases:
//!
//! | Integral | Call |
//! |----------|------|
//! | `K(m)` | `cel(k_c, 1, 1, 1)` |
//! | `E(m)` | `cel(k_c, 1, 1, k_c²)` |
//! | `(K − E)/m` | `cel(k_c, 1, 0, 1)` |
//!
//! with `k_c = √(1 − m)`. The last form stays accurate as `m → 0`, where the
//! difference `K − E` would cancel.
use std::f64::consts::FRAC_PI_2;

/// Relative tolerance on the AGM step; the error of the result is its square.
const CONVERGENCE: f64 = 1e-9;

/// The AGM converges quadratically, this bound is never reached for `k_c > 0`.
const MAX_ITERATIONS: usize = 60;

/// Bulirsch's `cel(k_c, p, a, b)` for `k_c ≠ 0` and `p > 0`.
pub fn cel(kc: f64, p: f64, a: f64, b: f64) -> f64 {
    let mut qc = kc.abs();
    let mut p = p.sqrt();
    let mut a = a;
    let mut b = b / p;
    let mut e = qc;
    let mut em = 1.0;

    for _ in 0..MAX_ITERATIONS {
        let f = a;
        a += b / p;
        let g = e / p;
        b = 2.0 * (b + f * g);
        p += g;
        let previous = em;
        em += qc;
        if (previous - qc).abs() <= previous * CONVERGENCE {
            break;
        }
        qc = 2.0 * e.sqrt();
        e = qc * em;
    }
    FRAC_PI_2 * (b + a * em) / (em * (em + p))
}
