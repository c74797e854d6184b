//! # Real spherical harmonics and the polynomial basis
//!
//! Coefficient vectors are ordered `(0,0), (1,−1), (1,0), (1,1), (2,−2), …`,
//! i.e. `n = l² + l + m`.
//!
//! ## Spherical harmonics
//!
//! Real, orthonormal, no Condon–Shortley phase, pole along `+z`:
//!
//! ```text
//! Y_lm = N_lm · Φ_m(x, y) · d^{|m|}P_l/dz^{|m|}(z)
//! N_lm = √((2l+1)/4π · (l−|m|)!/(l+|m|)!)  (× √2 when m ≠ 0)
//! Φ_m  = Re (x + iy)^m   for m ≥ 0
//!        Im (x + iy)^|m| for m < 0
//! ```
//!
//! ## Polynomial basis
//!
//! On the visible hemisphere `z = √(1 − x² − y²)`, so every polynomial in
//! `x, y, z` reduces to monomials `xⁱ yʲ zᵏ` with `k ∈ {0, 1}`. Monomial
//! `xⁱ yʲ` takes the slot of `(l, m) = (i + j, j − i)`, monomial `xⁱ yʲ z` the
//! slot of `(i + j + 1, j − i)`, so the polynomial basis has exactly as many
//! terms as the harmonic basis of the same degree.
use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector, Vector3};

/// Index of `(l, m)` in a coefficient vector.
pub fn ylm_index(l: usize, m: i64) -> usize {
    ((l * l + l) as i64 + m) as usize
}

/// Number of coefficients up to degree `l_max`.
pub fn basis_size(l_max: usize) -> usize {
    (l_max + 1) * (l_max + 1)
}

/// `(l, m)` of a coefficient index.
pub fn ylm_degree_order(n: usize) -> (usize, i64) {
    let mut l = (n as f64).sqrt() as usize;
    while (l + 1) * (l + 1) <= n {
        l += 1;
    }
    while l * l > n {
        l -= 1;
    }
    (l, n as i64 - (l * l + l) as i64)
}

/// One term `c · xⁱ yʲ zᵏ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Monomial {
    pub i: u32,
    pub j: u32,
    pub k: u32,
    pub coeff: f64,
}

impl Monomial {
    pub fn evaluate(&self, v: &Vector3<f64>) -> f64 {
        self.coeff * v.x.powi(self.i as i32) * v.y.powi(self.j as i32) * v.z.powi(self.k as i32)
    }
}

/// Evaluate a sum of monomials at a point.
pub fn evaluate(poly: &[Monomial], v: &Vector3<f64>) -> f64 {
    poly.iter().map(|term| term.evaluate(v)).sum()
}

/// Slot of the reduced monomial `xⁱ yʲ zᵏ`, `k ∈ {0, 1}`.
pub fn poly_index(i: u32, j: u32, k: u32) -> usize {
    debug_assert!(k <= 1);
    let l = (i + j + k) as i64;
    let m = j as i64 - i as i64;
    (l * l + l + m) as usize
}

/// Exponents `(i, j, k)` of the polynomial-basis slot `n`.
pub fn poly_exponents(n: usize) -> (u32, u32, u32) {
    let (l, m) = ylm_degree_order(n);
    let (mu, nu) = (l as i64 - m, l as i64 + m);
    if nu % 2 == 0 {
        ((mu / 2) as u32, (nu / 2) as u32, 0)
    } else {
        (((mu - 1) / 2) as u32, ((nu - 1) / 2) as u32, 1)
    }
}

/// Add `coeff · xⁱ yʲ zᵏ` to `target` after eliminating `z² = 1 − x² − y²`.
pub fn reduce_into(target: &mut DVector<f64>, i: u32, j: u32, k: u32, coeff: f64) {
    if coeff == 0.0 {
        return;
    }
    let q = k / 2;
    let parity = k % 2;
    // (1 − x² − y²)^q = Σ q!/(a! b! c!) (−x²)^b (−y²)^c
    let mut outer = 1.0;
    for b in 0..=q {
        let mut inner = outer;
        for c in 0..=(q - b) {
            let sign = if (b + c) % 2 == 0 { 1.0 } else { -1.0 };
            target[poly_index(i + 2 * b, j + 2 * c, parity)] += sign * coeff * inner;
            inner = inner * (q - b - c) as f64 / (c + 1) as f64;
        }
        outer = outer * (q - b) as f64 / (b + 1) as f64;
    }
}

/// Coefficients of the Legendre polynomial `P_l` in powers of `z`.
fn legendre_coefficients(l: usize) -> Vec<f64> {
    let mut prev = vec![1.0];
    if l == 0 {
        return prev;
    }
    let mut current = vec![0.0, 1.0];
    for n in 1..l {
        let nf = n as f64;
        let mut next = vec![0.0; n + 2];
        for (power, c) in current.iter().enumerate() {
            next[power + 1] += (2.0 * nf + 1.0) * c / (nf + 1.0);
        }
        for (power, c) in prev.iter().enumerate() {
            next[power] -= nf * c / (nf + 1.0);
        }
        prev = current;
        current = next;
    }
    current
}

fn normalization(l: usize, m: i64) -> f64 {
    let am = m.unsigned_abs() as usize;
    let ratio: f64 = ((l - am + 1)..=(l + am)).map(|k| 1.0 / k as f64).product();
    let n = ((2 * l + 1) as f64 / (4.0 * PI) * ratio).sqrt();
    if m == 0 {
        n
    } else {
        n * std::f64::consts::SQRT_2
    }
}

/// `Y_lm` as an unreduced sum of monomials.
pub fn ylm_polynomial(l: usize, m: i64) -> Vec<Monomial> {
    let am = m.unsigned_abs() as usize;
    let norm = normalization(l, m);

    // d^|m| P_l / dz^|m|
    let legendre = legendre_coefficients(l);
    let derivative: Vec<(u32, f64)> = legendre
        .iter()
        .enumerate()
        .skip(am)
        .filter(|(_, c)| **c != 0.0)
        .map(|(power, c)| {
            let falling: f64 = ((power - am + 1)..=power).map(|k| k as f64).product();
            ((power - am) as u32, c * falling)
        })
        .collect();

    // Re / Im of (x + iy)^|m|
    let mut azimuthal = Vec::new();
    let mut binom = 1.0;
    for p in 0..=am {
        let keep = if m >= 0 { p % 2 == 0 } else { p % 2 == 1 };
        if keep {
            let sign = if (p / 2) % 2 == 0 { 1.0 } else { -1.0 };
            azimuthal.push(((am - p) as u32, p as u32, sign * binom));
        }
        binom = binom * (am - p) as f64 / (p + 1) as f64;
    }

    let mut terms = Vec::with_capacity(azimuthal.len() * derivative.len());
    for &(i, j, ca) in &azimuthal {
        for &(k, cz) in &derivative {
            terms.push(Monomial {
                i,
                j,
                k,
                coeff: norm * ca * cz,
            });
        }
    }
    terms
}

/// All harmonics up to `l_max`, in coefficient order.
pub fn ylm_table(l_max: usize) -> Vec<Vec<Monomial>> {
    (0..=l_max)
        .flat_map(|l| (-(l as i64)..=l as i64).map(move |m| ylm_polynomial(l, m)))
        .collect()
}

/// Change of basis from harmonic coefficients to polynomial coefficients (`A1`).
///
/// Column `n` holds the reduced polynomial of `Y_n`.
pub fn change_of_basis(table: &[Vec<Monomial>]) -> DMatrix<f64> {
    let size = table.len();
    let mut a1 = DMatrix::zeros(size, size);
    for (n, poly) in table.iter().enumerate() {
        let mut column = DVector::zeros(size);
        for term in poly {
            reduce_into(&mut column, term.i, term.j, term.k, term.coeff);
        }
        a1.set_column(n, &column);
    }
    a1
}

/// Evaluate a reduced polynomial-basis vector at the sky point `(x, y)`.
pub fn evaluate_reduced(poly: &DVector<f64>, x: f64, y: f64) -> f64 {
    let z = (1.0 - x * x - y * y).max(0.0).sqrt();
    poly.iter()
        .enumerate()
        .filter(|(_, c)| **c != 0.0)
        .map(|(n, c)| {
            let (i, j, k) = poly_exponents(n);
            c * x.powi(i as i32) * y.powi(j as i32) * z.powi(k as i32)
        })
        .sum()
}
