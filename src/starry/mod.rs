//! # Spherical-harmonic surfaces
//!
//! Occultation flux of bodies whose brightness is a spherical-harmonic map,
//! optionally multiplied by a polynomial limb-darkening law.
//!
//! ## Pipeline
//!
//! ```text
//! y  ──D·Z(α)──▶  y_obs  ──A1──▶  p  ──L──▶  p_ld  ──A2──▶  g
//!                                                          │
//!                             visible flux = (r − s)ᵀ · g ◀┘
//! ```
//!
//! * [`ylm`] – harmonic ↔ polynomial basis (`A1`),
//! * [`rotation`] – Wigner-D operators and the analytic spin,
//! * [`greens`] – Green's basis (`A2`) with its full-disk vector `r`,
//! * [`surface`] – the map and orientation value types.
//!
//! `s` is the Green's-theorem line integral of each basis field around the
//! occulted region: the limb arc has a closed form, the occultor arc is
//! integrated by Gauss–Legendre with `order` nodes except for the linear
//! field `z`, whose elliptic closed form is shared with
//! [`LimbDarkIntegrator`](crate::occultation::limb_dark::LimbDarkIntegrator).
//!
//! [`SurfaceProcessor`] owns every table for a given `(l_max, limb-darkening
//! degree, order)`; nothing is recomputed per time sample except the
//! rotation and the occultor arc.
//!
//! ## Example
//!
//! ```rust, no_run
//! use keplight::occultation::geometry::Overlap;
//! use keplight::occultation::limb_dark::LimbDarkening;
//! use keplight::starry::{surface::SurfaceMap, SurfaceProcessor};
//!
//! let processor = SurfaceProcessor::new(2, 2, 20).unwrap();
//! let map = SurfaceMap::uniform(2).with(1, 0, 0.3).unwrap();
//! let law = LimbDarkening::quadratic(0.4, 0.2).unwrap();
//!
//! let operator = processor.intensity_operator(&law).unwrap();
//! let poly = processor.intensity_polynomial(&operator, &map).unwrap();
//! let flux = processor.visible_flux(&poly, &Overlap::classify(0.5, 0.1), 0.3);
//! println!("{flux}");
//! ```
use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{DMatrix, DVector, Rotation3};
use tracing::debug;

use crate::{
    keplight_errors::KeplightError,
    occultation::{
        geometry::Overlap,
        limb_dark::{linear_occultor_arc, LimbDarkening},
        quadrature::GaussLegendre,
    },
};

use self::{
    greens::{GreensBasis, GreensField},
    rotation::{RotationOperator, RotationSampler},
    surface::{Surface, SurfaceMap},
    ylm::{basis_size, change_of_basis, poly_exponents, reduce_into, ylm_table, Monomial},
};

/// Green's basis and limb-arc integrals.
pub mod greens;

/// Rotation operators on harmonic coefficients.
pub mod rotation;

/// Map and orientation value types.
pub mod surface;

/// Real spherical harmonics and the polynomial basis.
pub mod ylm;

/// Precomputed tables for one `(l_max, limb-darkening degree, order)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceProcessor {
    l_max: usize,
    ld_degree: usize,
    table: Vec<Vec<Monomial>>,
    a1: DMatrix<f64>,
    greens: GreensBasis,
    /// `A2ᵀ · r`: disk integral of each polynomial-basis term
    disk_integrals: DVector<f64>,
    sampler: RotationSampler,
    quadrature: GaussLegendre,
}

impl SurfaceProcessor {
    /// Arguments
    /// -----------------
    /// * `l_max`: highest harmonic degree of the maps to process.
    /// * `ld_degree`: highest power of `μ` in the limb-darkening laws to apply.
    /// * `order`: Gauss–Legendre nodes on the occultor arc.
    ///
    /// Return
    /// ----------
    /// * The processor, or an error if `order == 0` or one of the basis
    ///   changes is singular.
    pub fn new(l_max: usize, ld_degree: usize, order: usize) -> Result<Self, KeplightError> {
        let quadrature = GaussLegendre::new(order)?;
        let table = ylm_table(l_max);
        let a1 = change_of_basis(&table);
        let greens = GreensBasis::new(l_max + ld_degree)?;
        let sampler = RotationSampler::new(&table, l_max)?;
        let disk_integrals = greens.a2().tr_mul(greens.full_disk());

        debug!(l_max, ld_degree, order, "surface processor tables built");
        Ok(Self {
            l_max,
            ld_degree,
            table,
            a1,
            greens,
            disk_integrals,
            sampler,
            quadrature,
        })
    }

    pub fn l_max(&self) -> usize {
        self.l_max
    }

    pub fn ld_degree(&self) -> usize {
        self.ld_degree
    }

    /// Degree of the limb-darkened intensity polynomial.
    pub fn degree(&self) -> usize {
        self.l_max + self.ld_degree
    }

    pub fn order(&self) -> usize {
        self.quadrature.order()
    }

    /// Harmonic → polynomial change of basis `A1`.
    pub fn a1(&self) -> &DMatrix<f64> {
        &self.a1
    }

    pub fn greens(&self) -> &GreensBasis {
        &self.greens
    }

    /// Exact rotation operator of degree `l_max`.
    pub fn rotation_operator(&self, rotation: &Rotation3<f64>) -> RotationOperator {
        self.sampler.operator(&self.table, rotation)
    }

    /// Body → observer operator `D(obliquity, inclination)` of `surface`.
    pub fn orientation_operator(&self, surface: &Surface) -> Result<RotationOperator, KeplightError> {
        self.check_degree(surface.map())?;
        Ok(self.rotation_operator(&surface.orientation()))
    }

    /// Map seen by the observer at time `t`: `D · Z(α(t)) · y`.
    ///
    /// `orientation` is the operator returned by [`Self::orientation_operator`]
    /// for the same surface.
    pub fn observed_map(&self, surface: &Surface, orientation: &RotationOperator, t: f64) -> SurfaceMap {
        surface
            .map()
            .padded(self.l_max)
            .spun(surface.spin_angle(t))
            .rotated(orientation)
    }

    /// `L · A1`: harmonic coefficients → limb-darkened intensity polynomial.
    ///
    /// Return
    /// ----------
    /// * A `basis_size(degree) × basis_size(l_max)` matrix, or
    ///   [`KeplightError::InvalidLimbDarkening`] when the law has a higher
    ///   degree than the processor was built for.
    pub fn intensity_operator(&self, law: &LimbDarkening) -> Result<DMatrix<f64>, KeplightError> {
        if law.degree() > self.ld_degree {
            return Err(KeplightError::InvalidLimbDarkening(format!(
                "law of degree {} exceeds the processor degree {}",
                law.degree(),
                self.ld_degree
            )));
        }

        let rows = basis_size(self.degree());
        let mut operator = DMatrix::zeros(rows, self.a1.ncols());
        for (n, column) in self.a1.column_iter().enumerate() {
            let mut product = DVector::zeros(rows);
            for (slot, c) in column.iter().enumerate().filter(|(_, c)| **c != 0.0) {
                let (i, j, k) = poly_exponents(slot);
                for (power, a) in law.polynomial().iter().enumerate() {
                    reduce_into(&mut product, i, j, k + power as u32, c * a);
                }
            }
            operator.set_column(n, &product);
        }
        Ok(operator)
    }

    /// Intensity polynomial of `map` through `operator` (from [`Self::intensity_operator`]).
    pub fn intensity_polynomial(
        &self,
        operator: &DMatrix<f64>,
        map: &SurfaceMap,
    ) -> Result<DVector<f64>, KeplightError> {
        self.check_degree(map)?;
        Ok(operator * map.padded(self.l_max).coefficients())
    }

    /// Flux of the whole visible disk, `rᵀ · A2 · p`.
    pub fn unocculted_flux(&self, poly: &DVector<f64>) -> f64 {
        self.disk_integrals.dot(poly)
    }

    /// Flux left visible by the occultor, `(r − s)ᵀ · A2 · p`.
    ///
    /// Arguments
    /// -----------------
    /// * `poly`: intensity polynomial of degree [`Self::degree`].
    /// * `overlap`: classified overlap, radii in units of the occulted radius.
    /// * `position_angle`: direction of the occultor center from `+x` toward `+y`.
    pub fn visible_flux(&self, poly: &DVector<f64>, overlap: &Overlap, position_angle: f64) -> f64 {
        match overlap {
            Overlap::None => self.unocculted_flux(poly),
            Overlap::Full => 0.0,
            _ => self.visible_greens_flux(&self.greens_coefficients(poly), overlap, position_angle),
        }
    }

    /// `A2 · p`: the intensity polynomial in the Green's basis.
    pub fn greens_coefficients(&self, poly: &DVector<f64>) -> DVector<f64> {
        self.greens.a2() * poly
    }

    /// [`Self::visible_flux`] from precomputed [`Self::greens_coefficients`].
    pub fn visible_greens_flux(
        &self,
        greens: &DVector<f64>,
        overlap: &Overlap,
        position_angle: f64,
    ) -> f64 {
        match overlap {
            Overlap::Full => 0.0,
            _ => {
                let occulted = self.occulted_solution(overlap, position_angle);
                (self.greens.full_disk() - occulted).dot(greens)
            }
        }
    }

    /// Line integrals `s` of every Green's field around the occulted region.
    pub fn occulted_solution(&self, overlap: &Overlap, position_angle: f64) -> DVector<f64> {
        match *overlap {
            Overlap::None => DVector::zeros(self.greens.fields().len()),
            Overlap::Full => self.greens.full_disk().clone(),
            Overlap::Interior { b, r } => self.occultor_arc(overlap, b, r, position_angle, |t| {
                (PI * (t + 1.0), PI)
            }),
            Overlap::Partial {
                b,
                r,
                kappa0,
                kappa1,
                ..
            } => {
                // the occultor arc inside the disk faces the occulted center
                let center = position_angle + PI;
                let arc = self.occultor_arc(overlap, b, r, position_angle, |t| {
                    let (sin_t, cos_t) = (FRAC_PI_2 * t).sin_cos();
                    (center + kappa0 * sin_t, kappa0 * FRAC_PI_2 * cos_t)
                });
                arc + self
                    .greens
                    .limb_arc(position_angle - kappa1, position_angle + kappa1)
            }
        }
    }

    /// Counter-clockwise integral along the occultor circle, parameterized by
    /// `t ∈ [−1, 1] ↦ (φ(t), dφ/dt)`.
    ///
    /// The sine map used for lens overlaps puts quadratic zeros of `z` at both
    /// ends, so the square-root behaviour at the limb does not slow convergence.
    /// The linear field does not depend on the position angle and takes its
    /// closed form instead.
    fn occultor_arc<F>(
        &self,
        overlap: &Overlap,
        b: f64,
        r: f64,
        position_angle: f64,
        angle: F,
    ) -> DVector<f64>
    where
        F: Fn(f64) -> (f64, f64),
    {
        let (sin_theta, cos_theta) = position_angle.sin_cos();
        let (xo, yo) = (b * cos_theta, b * sin_theta);
        let fields = self.greens.fields();
        let mut solution = DVector::zeros(fields.len());

        for (t, w) in self.quadrature.nodes().iter().zip(self.quadrature.weights()) {
            let (phi, dphi) = angle(*t);
            let (sin_phi, cos_phi) = phi.sin_cos();
            let x = xo + r * cos_phi;
            let y = yo + r * sin_phi;
            let z = (1.0 - x * x - y * y).max(0.0).sqrt();
            let dx = -r * sin_phi * dphi;
            let dy = r * cos_phi * dphi;
            for (acc, field) in solution.iter_mut().zip(fields) {
                if *field == GreensField::Linear {
                    continue;
                }
                let (gx, gy) = field.at(x, y, z);
                *acc += w * (gx * dx + gy * dy);
            }
        }
        if let Some(slot) = fields.iter().position(|f| *f == GreensField::Linear) {
            solution[slot] = linear_occultor_arc(overlap);
        }
        solution
    }

    fn check_degree(&self, map: &SurfaceMap) -> Result<(), KeplightError> {
        if map.l_max() > self.l_max {
            return Err(KeplightError::InvalidSurfaceMap(format!(
                "map of degree {} exceeds the processor degree {}",
                map.l_max(),
                self.l_max
            )));
        }
        Ok(())
    }
}
