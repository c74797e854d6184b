//! # Occultation geometry
//!
//! Classification of the overlap between an occulted disk and a circular
//! occultor, everything normalized to the occulted radius (`R = 1`).
//!
//! ## Inputs
//!
//! * `b` – center-to-center sky separation in units of `R`,
//! * `r` – occultor radius in units of `R`.
//!
//! ## Variants
//!
//! | Condition | Variant | Uniform occulted fraction |
//! |-----------|---------|---------------------------|
//! | `r ≤ 0` or `b ≥ 1 + r` | [`Overlap::None`] | `0` |
//! | `r ≥ 1 + b` | [`Overlap::Full`] | `1` |
//! | `b ≤ 1 − r` | [`Overlap::Interior`] | `r²` |
//! | otherwise | [`Overlap::Partial`] | `(r²κ₀ + κ₁ − A_kite)/π` |
//!
//! The partial-overlap angles come from the kite area `A_kite` (twice the
//! area of the triangle with sides `1, b, r`), computed with the sorted-side
//! Heron formula so that nearly degenerate triangles keep full precision:
//!
//! ```text
//! κ₀ = atan2(2·A_kite, (r − 1)(r + 1) + b²)    half-angle of the occultor arc
//! κ₁ = atan2(2·A_kite, (1 − r)(1 + r) + b²)    half-angle of the limb arc
//! ```
//!
//! None of the degenerate configurations (`b = 0`, `r = 0`, `r = 1`) divides
//! by `b` or `r`.
//!
//! ## Differentiability
//!
//! Inside each variant the area, `κ₀`, `κ₁` and `A_kite` are smooth in
//! `(b, r)`. The branch points are the variant boundaries of the table:
//!
//! * `b = 1 + r` and the `r ≤ 0` cutoff, into [`Overlap::None`];
//! * `b = 1 − r`, between [`Overlap::Interior`] and [`Overlap::Partial`];
//! * `r = 1 + b`, into [`Overlap::Full`].
//!
//! The area is continuous across all of them, with a jump in a higher
//! derivative. [`OccultationGeometry::new`] adds a hard switch on the sign of
//! `z_occultor − z_occulted`, which turns the overlap off while the bodies are
//! still projected on each other; in a light curve it only fires behind the
//! occulted body, away from any transit. `b = |b|` and `atan2` for the
//! position angle are not smooth at `b = 0`, where nothing downstream depends
//! on the angle.
use std::f64::consts::PI;

use nalgebra::Vector3;

/// Overlap between the unit occulted disk and an occultor of radius `r` at distance `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlap {
    /// No overlap.
    None,
    /// The occulted disk is entirely covered.
    Full,
    /// The occultor lies entirely inside the occulted disk.
    Interior { b: f64, r: f64 },
    /// Lens-shaped overlap.
    Partial {
        b: f64,
        r: f64,
        kappa0: f64,
        kappa1: f64,
        kite_area: f64,
    },
}

impl Overlap {
    /// Classify the configuration `(b, r)`.
    pub fn classify(b: f64, r: f64) -> Self {
        let b = b.abs();
        if r <= 0.0 || b >= 1.0 + r {
            Overlap::None
        } else if r >= 1.0 + b {
            Overlap::Full
        } else if b <= 1.0 - r {
            Overlap::Interior { b, r }
        } else {
            let kite_area = 2.0 * triangle_area(1.0, b, r);
            let kappa0 = (2.0 * kite_area).atan2((r - 1.0) * (r + 1.0) + b * b);
            let kappa1 = (2.0 * kite_area).atan2((1.0 - r) * (1.0 + r) + b * b);
            Overlap::Partial {
                b,
                r,
                kappa0,
                kappa1,
                kite_area,
            }
        }
    }

    /// Area of the occulted part of the unit disk.
    pub fn area(&self) -> f64 {
        match *self {
            Overlap::None => 0.0,
            Overlap::Full => PI,
            Overlap::Interior { r, .. } => PI * r * r,
            Overlap::Partial {
                r,
                kappa0,
                kappa1,
                kite_area,
                ..
            } => r * r * kappa0 + kappa1 - kite_area,
        }
    }

    /// Occulted fraction of a uniformly bright disk.
    pub fn uniform_fraction(&self) -> f64 {
        match self {
            Overlap::None => 0.0,
            Overlap::Full => 1.0,
            _ => self.area() / PI,
        }
    }

    pub fn is_occulting(&self) -> bool {
        !matches!(self, Overlap::None)
    }

    /// Partial overlap with the occultor center outside the occulted disk.
    pub fn is_grazing(&self) -> bool {
        matches!(self, Overlap::Partial { b, .. } if *b > 1.0)
    }
}

/// Area of a triangle from its side lengths, stable for needle-shaped triangles.
fn triangle_area(a: f64, b: f64, c: f64) -> f64 {
    let mut sides = [a, b, c];
    sides.sort_by(|x, y| y.total_cmp(x));
    let [a, b, c] = sides;
    let product = (a + (b + c)) * (c - (a - b)) * (c + (a - b)) * (a + (b - c));
    0.25 * product.max(0.0).sqrt()
}

/// Sky-plane configuration of one occultor in front of one occulted body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccultationGeometry {
    /// Projected center-to-center distance, same unit as the inputs.
    pub separation: f64,
    /// Separation in units of the occulted radius.
    pub impact_param: f64,
    /// Position angle of the occultor around the occulted center, from `+x` toward `+y`.
    pub position_angle: f64,
    /// Occultor radius in units of the occulted radius.
    pub radius_ratio: f64,
    pub overlap: Overlap,
}

impl OccultationGeometry {
    /// Build the geometry from 3D positions, `+z` toward the observer.
    ///
    /// Arguments
    /// -----------------
    /// * `occulted`, `occulted_radius`: position and radius of the body being hidden.
    /// * `occultor`, `occultor_radius`: position and radius of the body in front.
    ///
    /// Return
    /// ----------
    /// * The geometry, with [`Overlap::None`] whenever the occultor is not in
    ///   front (`z_occultor ≤ z_occulted`) or the occulted body has no extent.
    pub fn new(
        occulted: &Vector3<f64>,
        occulted_radius: f64,
        occultor: &Vector3<f64>,
        occultor_radius: f64,
    ) -> Self {
        let dx = occultor.x - occulted.x;
        let dy = occultor.y - occulted.y;
        let separation = dx.hypot(dy);

        if occulted_radius <= 0.0 {
            return Self {
                separation,
                impact_param: f64::INFINITY,
                position_angle: dy.atan2(dx),
                radius_ratio: 0.0,
                overlap: Overlap::None,
            };
        }

        let impact_param = separation / occulted_radius;
        let radius_ratio = occultor_radius / occulted_radius;
        let overlap = if occultor.z > occulted.z {
            Overlap::classify(impact_param, radius_ratio)
        } else {
            Overlap::None
        };

        Self {
            separation,
            impact_param,
            position_angle: dy.atan2(dx),
            radius_ratio,
            overlap,
        }
    }

    /// Occultor center in units of the occulted radius, relative to the occulted center.
    pub fn occultor_offset(&self) -> (f64, f64) {
        let (sin_t, cos_t) = self.position_angle.sin_cos();
        (self.impact_param * cos_t, self.impact_param * sin_t)
    }
}
