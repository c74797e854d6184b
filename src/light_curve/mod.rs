//! # Light curves
//!
//! This module composes the orbit solver, the occultation geometry and the two
//! flux models into time series:
//!
//! - [`LightCurveParams`] – precision and exposure settings, with a validating
//!   builder and a table-style alternate [`Display`](std::fmt::Display),
//! - [`engine::LightCurveEngine`] – per-body emitters prepared once for a
//!   [`System`](crate::system::System), evaluated over a time array,
//! - [`LightCurve`] – the result: total flux, visible flux per body and the
//!   flux removed from the central body by each companion.
//!
//! ## Flux convention
//!
//! Every emitter contributes `amplitude × F_visible / F_reference`, where
//! `F_reference` is the unocculted disk flux of the same body with a uniform
//! map. A unit-amplitude central body with no occultation is therefore exactly
//! `1.0`, companions default to amplitude `0` (dark).
//!
//! ## Example
//!
//! ```rust, no_run
//! use keplight::light_curve::{engine::LightCurveEngine, LightCurveParams};
//! use keplight::occultation::limb_dark::LimbDarkening;
//! use keplight::orbit_type::OrbitalElements;
//! use keplight::system::{Body, Central, System};
//!
//! let central = Central::new(1.0, 1.0)
//!     .unwrap()
//!     .with_limb_darkening(LimbDarkening::quadratic(0.1, 0.06).unwrap());
//! let elements = OrbitalElements::builder()
//!     .period(3.0)
//!     .duration(0.12)
//!     .radius(0.1)
//!     .build(&central)
//!     .unwrap();
//! let system = System::new(central).add_body(Body::new(elements));
//!
//! let params = LightCurveParams::builder().order(20).build().unwrap();
//! let engine = LightCurveEngine::new(system, params).unwrap();
//! let times: Vec<f64> = (0..500).map(|i| -0.25 + 0.001 * i as f64).collect();
//! let curve = engine.light_curve(&times);
//! println!("{:?}", &curve.total[..5]);
//! ```
use std::cmp::Ordering::{Equal, Greater};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{kepler::DEFAULT_KEPLER_ITERATIONS, keplight_errors::KeplightError};

/// Light-curve evaluation.
pub mod engine;

/// Precision and exposure settings of a [`engine::LightCurveEngine`].
///
/// Fields
/// -----------------
/// * `order` – Gauss–Legendre nodes for limb-darkening powers without a closed
///   form and for the occultor arc of mapped surfaces.
/// * `kepler_iterations` – fixed number of Householder steps in the Kepler solver.
/// * `exposure_time` – exposure length in days, `0` for instantaneous samples.
/// * `oversample` – sub-exposures averaged per sample when `exposure_time > 0`.
///
/// Defaults
/// -----------------
/// * `order`: 10
/// * `kepler_iterations`: 10
/// * `exposure_time`: 0.0 d
/// * `oversample`: 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightCurveParams {
    pub order: usize,
    pub kepler_iterations: usize,
    pub exposure_time: f64,
    pub oversample: usize,
}

impl LightCurveParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fluent builder starting from the defaults.
    ///
    /// ```rust,no_run
    /// use keplight::light_curve::LightCurveParams;
    ///
    /// let params = LightCurveParams::builder()
    ///     .order(50)
    ///     .exposure_time(0.02)
    ///     .oversample(7)
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> LightCurveParamsBuilder {
        LightCurveParamsBuilder::new()
    }

    /// Time offsets of the sub-exposures around a sample (midpoint rule).
    pub fn exposure_offsets(&self) -> Vec<f64> {
        if self.exposure_time == 0.0 || self.oversample <= 1 {
            return vec![0.0];
        }
        let n = self.oversample as f64;
        (0..self.oversample)
            .map(|k| self.exposure_time * ((k as f64 + 0.5) / n - 0.5))
            .collect()
    }
}

impl Default for LightCurveParams {
    fn default() -> Self {
        LightCurveParams {
            order: 10,
            kepler_iterations: DEFAULT_KEPLER_ITERATIONS,
            exposure_time: 0.0,
            oversample: 1,
        }
    }
}

/// Builder for [`LightCurveParams`], with validation.
#[derive(Debug, Clone)]
pub struct LightCurveParamsBuilder {
    params: LightCurveParams,
}

impl Default for LightCurveParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LightCurveParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: LightCurveParams::default(),
        }
    }

    pub fn order(mut self, v: usize) -> Self {
        self.params.order = v;
        self
    }
    pub fn kepler_iterations(mut self, v: usize) -> Self {
        self.params.kepler_iterations = v;
        self
    }
    pub fn exposure_time(mut self, v: f64) -> Self {
        self.params.exposure_time = v;
        self
    }
    pub fn oversample(mut self, v: usize) -> Self {
        self.params.oversample = v;
        self
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `order ≥ 1`, `kepler_iterations ≥ 1`, `oversample ≥ 1`.
    /// * `exposure_time` finite and `≥ 0`.
    ///
    /// A low `order` is accepted: it only trades accuracy for speed.
    pub fn build(self) -> Result<LightCurveParams, KeplightError> {
        let p = &self.params;

        if p.order == 0 {
            return Err(KeplightError::InvalidQuadratureOrder(p.order));
        }
        if p.kepler_iterations == 0 {
            return Err(KeplightError::InvalidLightCurveParameter(
                "kepler_iterations must be >= 1".into(),
            ));
        }
        if p.oversample == 0 {
            return Err(KeplightError::InvalidLightCurveParameter(
                "oversample must be >= 1".into(),
            ));
        }
        if !(Self::ge0(p.exposure_time) && p.exposure_time.is_finite()) {
            return Err(KeplightError::InvalidLightCurveParameter(
                "exposure_time must be finite and non-negative".into(),
            ));
        }

        Ok(self.params)
    }
}

impl fmt::Display for LightCurveParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 40;
            writeln!(f, "Light Curve Parameters")?;
            writeln!(f, "----------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Precision]")?;
            line!("order             = {}", self.order, "Gauss-Legendre nodes")?;
            line!(
                "kepler_iterations = {}",
                self.kepler_iterations,
                "Fixed Kepler refinement steps"
            )?;

            writeln!(f, "\n[Exposure]")?;
            line!(
                "exposure_time     = {:.5} d",
                self.exposure_time,
                "Integration time per sample"
            )?;
            line!(
                "oversample        = {}",
                self.oversample,
                "Sub-exposures per sample"
            )?;
            Ok(())
        } else {
            write!(
                f,
                "LightCurveParams(order={}, kepler_iterations={}, exposure_time={:.5}d, oversample={})",
                self.order, self.kepler_iterations, self.exposure_time, self.oversample
            )
        }
    }
}

/// Fluxes sampled on a time array.
///
/// `per_body[0]` is the central body, `per_body[i + 1]` the companion `i`;
/// `transits[i]` is the (non-positive for a limb-darkened body) change of the
/// central flux caused by companion `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightCurve {
    pub times: Vec<f64>,
    pub total: Vec<f64>,
    pub per_body: Vec<Vec<f64>>,
    pub transits: Vec<Vec<f64>>,
}

impl LightCurve {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Flux of the central body alone.
    pub fn central(&self) -> &[f64] {
        &self.per_body[0]
    }

    /// Sample index of the lowest total flux, `None` for an empty curve.
    pub fn minimum(&self) -> Option<usize> {
        self.total
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
    }
}
