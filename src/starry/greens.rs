//! # Green's basis
//!
//! Each polynomial-basis slot `n = (l, m)` gets a basis polynomial `gₙ` with an
//! explicit vector field `Gₙ` such that `∂Gₙʸ/∂x − ∂Gₙˣ/∂y = gₙ` on the
//! visible hemisphere. With `μ = l − m`, `ν = l + m`:
//!
//! | Case | `gₙ` | `Gₙ` |
//! |------|------|------|
//! | `ν` even | `(μ/2 + 1) x^{μ/2} y^{ν/2}` | `(0, x^{μ/2+1} y^{ν/2})` |
//! | `l = 1, m = 0` | `z` | `(1 − z³)/(3(1 − z²)) · (−y, x)` |
//! | `μ = 1`, `l` even | `3 x^{l−2} y z` | `(x^{l−2} z³, 0)` |
//! | `μ = 1`, `l ≥ 3` odd | `−x^{l−3} z + x^{l−1} z + 4 x^{l−3} y² z` | `(x^{l−3} y z³, 0)` |
//! | otherwise | `a x^{a−1} y^b z − a x^{a−1} y^{b+2} z − (a+3) x^{a+1} y^b z` | `(0, xᵃ yᵇ z³)` |
//!
//! with `a = (μ − 3)/2`, `b = (ν − 1)/2`. The integral of a polynomial over any
//! region of the disk is then a line integral of the fields around its boundary.
//!
//! On the limb (`z = 0`) only the first two kinds survive, which gives the
//! closed-form limb-arc terms used by [`GreensBasis::limb_arc`].
use nalgebra::{DMatrix, DVector};

use crate::{
    keplight_errors::KeplightError,
    occultation::quadrature::trig_power_integral,
    starry::ylm::{basis_size, poly_index, ylm_degree_order},
};

/// Vector field attached to one Green's basis slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreensField {
    /// `(0, xᵖ yᵠ)`
    Plain { p: u32, q: u32 },
    /// `(1 − z³)/(3(1 − z²)) · (−y, x)`
    Linear,
    /// `(xᵖ z³, 0)`
    XPower { p: u32 },
    /// `(xᵖ y z³, 0)`
    XPowerY { p: u32 },
    /// `(0, xᵖ yᵠ z³)`
    Cubic { p: u32, q: u32 },
}

impl GreensField {
    fn for_slot(n: usize) -> Self {
        let (l, m) = ylm_degree_order(n);
        let l = l as i64;
        let (mu, nu) = (l - m, l + m);
        if nu % 2 == 0 {
            GreensField::Plain {
                p: (mu / 2 + 1) as u32,
                q: (nu / 2) as u32,
            }
        } else if l == 1 && m == 0 {
            GreensField::Linear
        } else if mu == 1 && l % 2 == 0 {
            GreensField::XPower { p: (l - 2) as u32 }
        } else if mu == 1 {
            GreensField::XPowerY { p: (l - 3) as u32 }
        } else {
            GreensField::Cubic {
                p: ((mu - 3) / 2) as u32,
                q: ((nu - 1) / 2) as u32,
            }
        }
    }

    /// `(Gˣ, Gʸ)` at `(x, y)` with `z = √(1 − x² − y²)`.
    #[inline]
    pub fn at(&self, x: f64, y: f64, z: f64) -> (f64, f64) {
        match *self {
            GreensField::Plain { p, q } => (0.0, x.powi(p as i32) * y.powi(q as i32)),
            GreensField::Linear => {
                let f = (1.0 + z + z * z) / (3.0 * (1.0 + z));
                (-f * y, f * x)
            }
            GreensField::XPower { p } => (x.powi(p as i32) * z * z * z, 0.0),
            GreensField::XPowerY { p } => (x.powi(p as i32) * y * z * z * z, 0.0),
            GreensField::Cubic { p, q } => (0.0, x.powi(p as i32) * y.powi(q as i32) * z * z * z),
        }
    }

    /// `gₙ` as `(i, j, k, coeff)` monomials, `k ∈ {0, 1}`.
    fn polynomial(&self) -> Vec<(u32, u32, u32, f64)> {
        match *self {
            GreensField::Plain { p, q } => vec![(p - 1, q, 0, p as f64)],
            GreensField::Linear => vec![(0, 0, 1, 1.0)],
            GreensField::XPower { p } => vec![(p, 1, 1, 3.0)],
            GreensField::XPowerY { p } => {
                vec![(p, 0, 1, -1.0), (p + 2, 0, 1, 1.0), (p, 2, 1, 4.0)]
            }
            GreensField::Cubic { p, q } => {
                let a = p as f64;
                let mut terms = vec![(p + 1, q, 1, -(a + 3.0))];
                if p > 0 {
                    terms.push((p - 1, q, 1, a));
                    terms.push((p - 1, q + 2, 1, -a));
                }
                terms
            }
        }
    }
}

/// Green's basis up to a given degree and its change of basis.
#[derive(Debug, Clone, PartialEq)]
pub struct GreensBasis {
    fields: Vec<GreensField>,
    /// polynomial basis → Green's basis (`A2`)
    a2: DMatrix<f64>,
    /// `∮ Gₙ · dr` around the full unit disk
    full_disk: DVector<f64>,
}

impl GreensBasis {
    pub fn new(degree: usize) -> Result<Self, KeplightError> {
        let size = basis_size(degree);
        let fields: Vec<GreensField> = (0..size).map(GreensField::for_slot).collect();

        let mut to_poly = DMatrix::zeros(size, size);
        for (n, field) in fields.iter().enumerate() {
            for (i, j, k, c) in field.polynomial() {
                to_poly[(poly_index(i, j, k), n)] += c;
            }
        }
        let a2 = to_poly.try_inverse().ok_or_else(|| {
            KeplightError::SingularBasisTransform(format!("Green's basis of degree {degree}"))
        })?;

        let full_disk = DVector::from_iterator(
            size,
            fields
                .iter()
                .map(|field| limb_arc_integral(field, 0.0, 2.0 * std::f64::consts::PI)),
        );

        Ok(Self {
            fields,
            a2,
            full_disk,
        })
    }

    pub fn fields(&self) -> &[GreensField] {
        &self.fields
    }

    pub fn a2(&self) -> &DMatrix<f64> {
        &self.a2
    }

    pub fn full_disk(&self) -> &DVector<f64> {
        &self.full_disk
    }

    /// Line integrals along the unit circle from `start` to `end` (counter-clockwise).
    pub fn limb_arc(&self, start: f64, end: f64) -> DVector<f64> {
        DVector::from_iterator(
            self.fields.len(),
            self.fields
                .iter()
                .map(|field| limb_arc_integral(field, start, end)),
        )
    }
}

/// `∫ Gₙ · dr` on the unit circle, where `z = 0`.
fn limb_arc_integral(field: &GreensField, start: f64, end: f64) -> f64 {
    match *field {
        // Gʸ dy = cosᵖλ sinᵠλ · cos λ dλ
        GreensField::Plain { p, q } => trig_power_integral(p + 1, q, start, end),
        GreensField::Linear => (end - start) / 3.0,
        _ => 0.0,
    }
}
