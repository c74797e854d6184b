//! # Polynomial limb darkening
//!
//! Occulted flux of a radially symmetric, limb-darkened disk covered by a
//! circular occultor.
//!
//! ## Law
//!
//! The intensity at `μ = cos θ = √(1 − ρ²)` follows the polynomial law of any
//! length
//!
//! ```text
//! I(μ) = 1 − Σₙ uₙ (1 − μ)ⁿ          n = 1..N
//!      = Σₖ aₖ μᵏ                     k = 0..N
//! ```
//!
//! and the unocculted disk flux is `F₀ = Σₖ aₖ · 2π/(k + 2)`, which must be positive.
//!
//! ## Integration strategy
//!
//! The occulted flux is split per power `μᵏ`:
//!
//! * `k = 0` – the occulted area, closed form from [`Overlap`];
//! * `k = 1` – Green's theorem with `G = (1 + μ + μ²)/(3(1 + μ))·(−y, x)`. The
//!   limb arc gives `2κ₁/3`, the occultor arc reduces to complete elliptic
//!   integrals evaluated with [`cel`];
//! * `k = 2` – `area − ∬ρ² dA`, closed form by Green's theorem with the field
//!   `G = (−y³/3, x³/3)` integrated along the limb arc and the occultor arc
//!   ([`trig_power_integral`]);
//! * any other `k` – Gauss–Legendre quadrature with `order` nodes of
//!   `∫ 2α(ρ) ρ μᵏ dρ` over the partially covered annulus, plus the closed form
//!   `2π/(k+2)·(1 − (1 − ρ²)^{(k+2)/2})` of a fully covered inner disk.
//!
//! Linear and quadratic laws are therefore exact and independent of `order`.
//! The quadrature integrand has square-root endpoint behavior, so for higher
//! laws the error falls algebraically with `order` and `order` sets the precision.
//!
//! ## Differentiability
//!
//! The occulted flux is continuous in `(b, r, uₙ)` and smooth inside each
//! [`Overlap`] variant. Derivatives break only where the variant changes:
//!
//! * `b = 1 + r` (first contact) and the `r ≤ 0` cutoff, both to [`Overlap::None`];
//! * `b = 1 − r` (second contact), between [`Overlap::Interior`] and [`Overlap::Partial`];
//! * `r = 1 + b`, to [`Overlap::Full`].
//!
//! `b = r` is not a break point even though the linear term has a branch
//! there: the `±π` winding of its elementary part cancels the third-kind pole
//! of its elliptic part, and `b = r` itself drops both.
//!
//! Upstream, [`OccultationGeometry::new`](crate::occultation::geometry::OccultationGeometry::new)
//! switches between transit and eclipse on the sign of `z`, and
//! [`KeplerSolver::eccentric_anomaly`](crate::kepler::KeplerSolver::eccentric_anomaly)
//! reduces the mean anomaly with `rem_euclid`. The reduction jumps by `2π`
//! once per orbit, positions stay smooth across it.
//!
//! ## See also
//!
//! * [`crate::starry::SurfaceProcessor`] – the same flux for non-uniform maps.
use std::f64::consts::PI;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::{
    keplight_errors::KeplightError,
    occultation::{
        elliptic::cel,
        geometry::Overlap,
        quadrature::{trig_power_integral, GaussLegendre},
    },
};

/// Coefficient storage; quadratic laws stay inline.
pub type Coefficients = SmallVec<[f64; 4]>;

/// Orders below this are legal but coarse.
const LOW_ORDER_WARNING: usize = 5;

/// Floor on the complementary modulus at internal tangency, where `K` diverges.
const MIN_MODULUS: f64 = 1e-16;

/// Powers of `μ` with a closed-form occulted flux.
const CLOSED_FORM_POWERS: usize = 3;

/// Polynomial limb-darkening law `I(μ) = 1 − Σ uₙ (1 − μ)ⁿ`.
#[derive(Debug, Clone, PartialEq)]
pub struct LimbDarkening {
    coefficients: Coefficients,
    polynomial: Coefficients,
    total_flux: f64,
}

impl Default for LimbDarkening {
    fn default() -> Self {
        Self::uniform()
    }
}

impl LimbDarkening {
    /// Build a law from `u₁, u₂, …`; an empty slice is a uniform disk.
    ///
    /// Return
    /// ----------
    /// * The law, or [`KeplightError::InvalidLimbDarkening`] when a coefficient
    ///   is not finite or the disk flux `F₀` is not positive.
    pub fn new(coefficients: &[f64]) -> Result<Self, KeplightError> {
        if let Some(bad) = coefficients.iter().find(|u| !u.is_finite()) {
            return Err(KeplightError::InvalidLimbDarkening(format!(
                "coefficient {bad} is not finite"
            )));
        }

        let polynomial = expand_to_mu_powers(coefficients);
        let total_flux = polynomial
            .iter()
            .enumerate()
            .map(|(k, a)| a * 2.0 * PI / (k as f64 + 2.0))
            .sum::<f64>();

        if !(total_flux > 0.0) {
            return Err(KeplightError::InvalidLimbDarkening(format!(
                "disk-integrated flux must be > 0, got {total_flux} for u = {coefficients:?}"
            )));
        }

        Ok(Self {
            coefficients: coefficients.iter().copied().collect(),
            polynomial,
            total_flux,
        })
    }

    /// Uniformly bright disk.
    pub fn uniform() -> Self {
        Self {
            coefficients: SmallVec::new(),
            polynomial: SmallVec::from_slice(&[1.0]),
            total_flux: PI,
        }
    }

    /// Quadratic law `I(μ) = 1 − u₁(1 − μ) − u₂(1 − μ)²`.
    pub fn quadratic(u1: f64, u2: f64) -> Result<Self, KeplightError> {
        Self::new(&[u1, u2])
    }

    /// The `uₙ` coefficients, `n = 1..N`.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// The same law as `Σₖ aₖ μᵏ`, `k = 0..N`.
    pub fn polynomial(&self) -> &[f64] {
        &self.polynomial
    }

    /// Highest power of `μ` in the law.
    pub fn degree(&self) -> usize {
        self.polynomial.len() - 1
    }

    /// Unocculted disk flux `F₀` of a unit disk.
    pub fn total_flux(&self) -> f64 {
        self.total_flux
    }

    pub fn is_uniform(&self) -> bool {
        self.polynomial.iter().skip(1).all(|a| *a == 0.0)
    }

    /// Specific intensity at `μ`, normalized to `I(1) = 1`.
    pub fn intensity(&self, mu: f64) -> f64 {
        self.polynomial.iter().rev().fold(0.0, |acc, a| acc * mu + a)
    }
}

/// `Σ uₙ(1 − μ)ⁿ` rewritten in powers of `μ`.
fn expand_to_mu_powers(u: &[f64]) -> Coefficients {
    let mut a: Coefficients = SmallVec::from_elem(0.0, u.len() + 1);
    a[0] = 1.0;
    for (idx, un) in u.iter().enumerate() {
        let n = idx + 1;
        let mut binom = 1.0;
        for k in 0..=n {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            a[k] -= un * binom * sign;
            binom = binom * (n - k) as f64 / (k + 1) as f64;
        }
    }
    a
}

/// Occulted flux calculator for one limb-darkening law.
///
/// Owns the law and the Gauss–Legendre table, both fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LimbDarkIntegrator {
    law: LimbDarkening,
    quadrature: GaussLegendre,
}

impl LimbDarkIntegrator {
    /// Arguments
    /// -----------------
    /// * `law`: limb-darkening law.
    /// * `order`: number of Gauss–Legendre nodes for the powers without a closed form.
    pub fn new(law: LimbDarkening, order: usize) -> Result<Self, KeplightError> {
        if order < LOW_ORDER_WARNING && law.polynomial.len() > 1 {
            warn!(order, "low quadrature order for a limb-darkened disk");
        }
        let quadrature = GaussLegendre::new(order)?;
        debug!(degree = law.degree(), order, "limb-darkening integrator ready");
        Ok(Self { law, quadrature })
    }

    pub fn law(&self) -> &LimbDarkening {
        &self.law
    }

    pub fn order(&self) -> usize {
        self.quadrature.order()
    }

    /// Fraction `ΔF/F₀` of the disk flux hidden by the occultor.
    pub fn occulted_fraction(&self, overlap: &Overlap) -> f64 {
        match *overlap {
            Overlap::None => 0.0,
            Overlap::Full => 1.0,
            _ => self.occulted_flux(overlap) / self.law.total_flux,
        }
    }

    /// Convenience wrapper classifying `(b, r)` first.
    pub fn occulted_fraction_at(&self, b: f64, r: f64) -> f64 {
        self.occulted_fraction(&Overlap::classify(b, r))
    }

    /// Visible fraction `1 − ΔF/F₀`.
    pub fn visible_fraction(&self, overlap: &Overlap) -> f64 {
        1.0 - self.occulted_fraction(overlap)
    }

    /// Hidden flux `ΔF` of the unit disk, in the units of [`LimbDarkening::total_flux`].
    pub fn occulted_flux(&self, overlap: &Overlap) -> f64 {
        let (b, r) = match *overlap {
            Overlap::None => return 0.0,
            Overlap::Full => return self.law.total_flux,
            Overlap::Interior { b, r } | Overlap::Partial { b, r, .. } => (b, r),
        };

        let a = &self.law.polynomial;
        let mut flux = a[0] * overlap.area();
        if let Some(a1) = a.get(1) {
            flux += a1 * linear_power_flux(overlap);
        }
        if let Some(a2) = a.get(2) {
            flux += a2 * quadratic_power_flux(overlap);
        }

        let higher = a.get(CLOSED_FORM_POWERS..).unwrap_or_default();
        if higher.iter().any(|ak| *ak != 0.0) {
            let powers = || (CLOSED_FORM_POWERS..).zip(higher);
            let profile = |mu: f64| powers().map(|(k, ak)| ak * mu.powi(k as i32)).sum::<f64>();
            flux += radial_integral(b, r, &self.quadrature, profile);
            let inner = inner_disk_radius(b, r);
            if inner > 0.0 {
                let edge_mu2 = (1.0 - inner * inner).max(0.0);
                flux += powers()
                    .map(|(k, ak)| {
                        let kf = k as f64;
                        ak * 2.0 * PI / (kf + 2.0) * (1.0 - edge_mu2.powf(0.5 * (kf + 2.0)))
                    })
                    .sum::<f64>();
            }
        }
        flux
    }
}

/// Radius of the disk around the occulted center that is entirely covered.
fn inner_disk_radius(b: f64, r: f64) -> f64 {
    if r > b {
        (r - b).min(1.0)
    } else {
        0.0
    }
}

/// `∬ μ dA` over the occulted region.
fn linear_power_flux(overlap: &Overlap) -> f64 {
    match *overlap {
        Overlap::None => 0.0,
        Overlap::Full => 2.0 * PI / 3.0,
        Overlap::Interior { .. } => linear_occultor_arc(overlap),
        Overlap::Partial { kappa1, .. } => 2.0 * kappa1 / 3.0 + linear_occultor_arc(overlap),
    }
}

/// Counter-clockwise `∫ G · dr` of `G = (1 + z + z²)/(3(1 + z)) · (−y, x)` along
/// the part of the occultor circle inside the unit disk; zero without one.
///
/// With `ψ` measured from the point of the circle closest to the disk center,
/// `ρ² = b² + r² − 2br cos ψ` and `c = r² − b²`, the integrand is
/// `(1 − z³)(1 + c/ρ²)/6`. The `1` part is elementary. The `z³` part becomes,
/// after `ρ² = e₁ + d sin²θ` with `e₁ = (b − r)²`, a sum of complete elliptic
/// integrals with a third-kind pole at `ρ = 0` weighted by `c`.
pub(crate) fn linear_occultor_arc(overlap: &Overlap) -> f64 {
    let (b, r, kappa0) = match *overlap {
        Overlap::None | Overlap::Full => return 0.0,
        Overlap::Interior { b, r } => (b, r, PI),
        Overlap::Partial { b, r, kappa0, .. } => (b, r, kappa0),
    };
    let c = (r - b) * (r + b);
    let e1 = (b - r) * (b - r);
    let outer = (1.0 - b + r) * (1.0 + b - r);

    let elliptic = if let Overlap::Interior { .. } = overlap {
        // whole circle, 1 − ρ² = (1 − e₁)(1 − m sin²θ)
        let d = 4.0 * b * r;
        let m = d / outer;
        let kc = modulus((1.0 - b - r) * (1.0 + b + r) / outer);
        let big_k = cel(kc, 1.0, 1.0, 1.0);
        let big_e = cel(kc, 1.0, 1.0, kc * kc);
        let delta3 = (2.0 * (2.0 - m) * big_e - (1.0 - m) * big_k) / 3.0;
        let pole = if c != 0.0 {
            let w = 1.0 / (1.0 - e1);
            let j1 = cel(kc, 1.0, 0.0, 1.0);
            let third = cel(kc, (e1 + d) / e1, 1.0, 1.0) / e1;
            c * (-(2.0 * w + e1 * w * w) * big_k + d * w * w * j1 + w * w * third)
        } else {
            0.0
        };
        2.0 / 3.0 * (1.0 - e1).powf(1.5) * (delta3 + pole)
    } else {
        // lens, ρ runs from |b − r| to the limb and 1 − ρ² = d cos²θ
        let d = 1.0 - e1;
        let m = outer / (4.0 * b * r);
        if m > 0.0 {
            let kc = modulus((b + r - 1.0) * (b + r + 1.0) / (4.0 * b * r));
            let big_k = cel(kc, 1.0, 1.0, 1.0);
            let j1 = cel(kc, 1.0, 0.0, 1.0);
            let j2 = (2.0 * (1.0 + m) * j1 - big_k) / (3.0 * m);
            let cos4 = big_k - 2.0 * j1 + j2;
            let pole = if c != 0.0 {
                let third = cel(kc, 1.0 / e1, 1.0, 1.0) / e1;
                c * (-(2.0 * d + e1) * big_k / (d * d) + j1 / d + third / (d * d))
            } else {
                0.0
            };
            2.0 / 3.0 * m.sqrt() * d.powf(1.5) * (cos4 + pole)
        } else {
            0.0
        }
    };

    // ∫ c/ρ² dψ, which winds by ±π when the circle encloses the disk center
    let winding = if c != 0.0 {
        let half = 0.5 * kappa0;
        2.0 * c.signum() * ((b + r) * half.sin()).atan2((b - r).abs() * half.cos())
    } else {
        0.0
    };
    (kappa0 + winding) / 3.0 - elliptic
}

/// Complementary modulus `k_c` from `k_c²`.
fn modulus(kc2: f64) -> f64 {
    kc2.max(0.0).sqrt().max(MIN_MODULUS)
}

/// `∬ μ² dA = area − ∬ ρ² dA` over the occulted region.
fn quadratic_power_flux(overlap: &Overlap) -> f64 {
    match *overlap {
        Overlap::None => 0.0,
        Overlap::Full => 0.5 * PI,
        Overlap::Interior { b, r } => {
            let area = PI * r * r;
            area - area * (b * b + 0.5 * r * r)
        }
        Overlap::Partial {
            b,
            r,
            kappa0,
            kappa1,
            ..
        } => {
            // occultor on the +x axis, boundary traversed counter-clockwise
            let limb = (trig_power_integral(0, 4, -kappa1, kappa1)
                + trig_power_integral(4, 0, -kappa1, kappa1))
                / 3.0;
            let (lo, hi) = (PI - kappa0, PI + kappa0);
            let occultor = r / 3.0
                * (r.powi(3) * (trig_power_integral(0, 4, lo, hi) + trig_power_integral(4, 0, lo, hi))
                    + b.powi(3) * trig_power_integral(1, 0, lo, hi)
                    + 3.0 * b * b * r * trig_power_integral(2, 0, lo, hi)
                    + 3.0 * b * r * r * trig_power_integral(3, 0, lo, hi));
            overlap.area() - (limb + occultor)
        }
    }
}

/// `∫ 2α(ρ) ρ g(μ) dρ` over the partially covered annulus `|b − r| ≤ ρ ≤ min(1, b + r)`.
fn radial_integral<F>(b: f64, r: f64, quadrature: &GaussLegendre, profile: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let lower = (b - r).abs();
    let upper = (b + r).min(1.0);
    if upper <= lower || b <= 0.0 {
        return 0.0;
    }
    quadrature.integrate(lower, upper, |rho| {
        let cos_alpha = ((rho * rho + b * b - r * r) / (2.0 * rho * b)).clamp(-1.0, 1.0);
        let mu = (1.0 - rho * rho).max(0.0).sqrt();
        2.0 * cos_alpha.acos() * rho * profile(mu)
    })
}

/// Occulted `∬ μᵏ dA` by quadrature only, for any `k`.
#[cfg(test)]
pub(crate) fn power_flux_by_quadrature(k: i32, overlap: &Overlap, quadrature: &GaussLegendre) -> f64 {
    let (b, r) = match *overlap {
        Overlap::None => return 0.0,
        Overlap::Full => return 2.0 * PI / (k as f64 + 2.0),
        Overlap::Interior { b, r } | Overlap::Partial { b, r, .. } => (b, r),
    };
    let kf = k as f64;
    let inner = inner_disk_radius(b, r);
    let inner_flux = 2.0 * PI / (kf + 2.0) * (1.0 - (1.0 - inner * inner).powf(0.5 * (kf + 2.0)));
    inner_flux + radial_integral(b, r, quadrature, |mu| mu.powi(k))
}
