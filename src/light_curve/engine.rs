//! # Light-curve engine
//!
//! [`LightCurveEngine`] turns a [`System`] into fluxes on a time array.
//!
//! ## Emitters
//!
//! Every body is prepared once, at construction, into one of three emitters:
//!
//! | Body | Emitter | Flux model |
//! |------|---------|------------|
//! | amplitude `0` | dark | none, the body only occults |
//! | no surface map | limb-darkened | [`LimbDarkIntegrator`] |
//! | surface map | mapped | [`SurfaceProcessor`] with the body limb darkening |
//!
//! ## Per time sample
//!
//! 1. relative position of every companion (fixed-iteration Kepler solve);
//! 2. companions with `z > 0` occult the central body, each one removing the
//!    flux of its own overlap (mutual companion overlaps are not resolved);
//! 3. companions with `z < 0` are occulted by the central body (secondary eclipse);
//! 4. the sample is averaged over the sub-exposures of
//!    [`LightCurveParams::exposure_offsets`].
//!
//! Samples are independent and evaluated with `rayon` when the `parallel`
//! feature is on.
use nalgebra::{DMatrix, DVector, Vector3};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::{
    kepler::KeplerSolver,
    keplight_errors::KeplightError,
    light_curve::{LightCurve, LightCurveParams},
    occultation::{
        geometry::OccultationGeometry,
        limb_dark::{LimbDarkIntegrator, LimbDarkening},
    },
    starry::{rotation::RotationOperator, surface::Surface, SurfaceProcessor},
    system::System,
};

/// Fluxes of one time sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxSample {
    pub total: f64,
    /// Central body first, then the companions in system order.
    pub per_body: Vec<f64>,
    /// Change of the central flux caused by each companion.
    pub transits: Vec<f64>,
}

impl FluxSample {
    fn zeros(companions: usize) -> Self {
        Self {
            total: 0.0,
            per_body: vec![0.0; companions + 1],
            transits: vec![0.0; companions],
        }
    }

    fn accumulate(&mut self, other: &FluxSample, weight: f64) {
        self.total += weight * other.total;
        for (acc, v) in self.per_body.iter_mut().zip(&other.per_body) {
            *acc += weight * v;
        }
        for (acc, v) in self.transits.iter_mut().zip(&other.transits) {
            *acc += weight * v;
        }
    }
}

/// Spherical-harmonic emitter with its precomputed operators.
#[derive(Debug, Clone)]
struct MappedEmitter {
    amplitude: f64,
    surface: Surface,
    processor: SurfaceProcessor,
    orientation: RotationOperator,
    intensity: DMatrix<f64>,
    reference_flux: f64,
    /// Set when the surface does not spin.
    fixed: Option<FixedIntensity>,
}

/// Observer-frame intensity of a surface that does not spin.
#[derive(Debug, Clone)]
struct FixedIntensity {
    polynomial: DVector<f64>,
    /// `A2 · polynomial`
    greens: DVector<f64>,
}

impl MappedEmitter {
    fn new(
        amplitude: f64,
        law: &LimbDarkening,
        surface: &Surface,
        order: usize,
    ) -> Result<Self, KeplightError> {
        let map = surface.map();
        let y00 = map.coefficients()[0];
        if !(y00 > 0.0) {
            return Err(KeplightError::InvalidSurfaceMap(format!(
                "the (0, 0) coefficient sets the flux scale and must be > 0, got {y00}"
            )));
        }

        let processor = SurfaceProcessor::new(map.l_max(), law.degree(), order)?;
        let orientation = processor.orientation_operator(surface)?;
        let intensity = processor.intensity_operator(law)?;
        let reference_flux = y00 * processor.unocculted_flux(&intensity.column(0).into_owned());

        let fixed = match surface.rotation_period() {
            Some(_) => None,
            None => {
                let polynomial = processor.intensity_polynomial(
                    &intensity,
                    &processor.observed_map(surface, &orientation, 0.0),
                )?;
                Some(FixedIntensity {
                    greens: processor.greens_coefficients(&polynomial),
                    polynomial,
                })
            }
        };

        Ok(Self {
            amplitude,
            surface: surface.clone(),
            processor,
            orientation,
            intensity,
            reference_flux,
            fixed,
        })
    }

    fn flux(&self, t: f64, occultation: Option<&OccultationGeometry>) -> f64 {
        let visible = match (&self.fixed, occultation) {
            (Some(fixed), Some(geometry)) => self.processor.visible_greens_flux(
                &fixed.greens,
                &geometry.overlap,
                geometry.position_angle,
            ),
            (Some(fixed), None) => self.processor.unocculted_flux(&fixed.polynomial),
            (None, _) => {
                let observed = self.processor.observed_map(&self.surface, &self.orientation, t);
                let poly = &self.intensity * observed.coefficients();
                match occultation {
                    Some(geometry) => self.processor.visible_flux(
                        &poly,
                        &geometry.overlap,
                        geometry.position_angle,
                    ),
                    None => self.processor.unocculted_flux(&poly),
                }
            }
        };
        self.amplitude * visible / self.reference_flux
    }
}

#[derive(Debug, Clone)]
enum Emitter {
    Dark,
    LimbDarkened {
        amplitude: f64,
        integrator: LimbDarkIntegrator,
    },
    Mapped(Box<MappedEmitter>),
}

impl Emitter {
    fn new(
        amplitude: f64,
        law: &LimbDarkening,
        surface: Option<&Surface>,
        order: usize,
    ) -> Result<Self, KeplightError> {
        if !amplitude.is_finite() {
            return Err(KeplightError::InvalidBody(format!(
                "amplitude must be finite, got {amplitude}"
            )));
        }
        if amplitude < 0.0 {
            return Err(KeplightError::InvalidBody(format!(
                "amplitude must be >= 0, got {amplitude}"
            )));
        }
        if amplitude == 0.0 {
            return Ok(Emitter::Dark);
        }
        match surface {
            None => Ok(Emitter::LimbDarkened {
                amplitude,
                integrator: LimbDarkIntegrator::new(law.clone(), order)?,
            }),
            Some(surface) => Ok(Emitter::Mapped(Box::new(MappedEmitter::new(
                amplitude, law, surface, order,
            )?))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Emitter::Dark => "dark",
            Emitter::LimbDarkened { .. } => "limb-darkened",
            Emitter::Mapped(_) => "mapped",
        }
    }

    /// Visible flux at `t`, with the body hidden by `occultation` if any.
    fn flux(&self, t: f64, occultation: Option<&OccultationGeometry>) -> f64 {
        match self {
            Emitter::Dark => 0.0,
            Emitter::LimbDarkened {
                amplitude,
                integrator,
            } => match occultation {
                Some(geometry) => amplitude * integrator.visible_fraction(&geometry.overlap),
                None => *amplitude,
            },
            Emitter::Mapped(mapped) => mapped.flux(t, occultation),
        }
    }
}

/// Light-curve evaluator for one system and one parameter set.
///
/// Construction validates the emitters and builds every table; evaluation is a
/// pure function of the time array. The engine is `Send + Sync`.
#[derive(Debug, Clone)]
pub struct LightCurveEngine {
    system: System,
    params: LightCurveParams,
    solver: KeplerSolver,
    offsets: Vec<f64>,
    central: Emitter,
    companions: Vec<Emitter>,
}

impl LightCurveEngine {
    /// Arguments
    /// -----------------
    /// * `system`: central body and companions.
    /// * `params`: precision and exposure settings.
    ///
    /// Return
    /// ----------
    /// * The engine, or the first invalid emitter (negative or non-finite
    ///   amplitude, mapped surface with `y₀₀ ≤ 0`, zero `order`).
    pub fn new(system: System, params: LightCurveParams) -> Result<Self, KeplightError> {
        let order = params.order;
        let central_body = system.central();
        let central = Emitter::new(
            central_body.amplitude(),
            central_body.limb_darkening(),
            central_body.surface(),
            order,
        )?;
        let companions = system
            .bodies()
            .iter()
            .map(|body| Emitter::new(body.amplitude(), body.limb_darkening(), body.surface(), order))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            central = central.kind(),
            companions = companions.len(),
            order,
            oversample = params.oversample,
            "light-curve engine ready"
        );

        Ok(Self {
            solver: KeplerSolver::new(params.kepler_iterations),
            offsets: params.exposure_offsets(),
            system,
            params,
            central,
            companions,
        })
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn params(&self) -> &LightCurveParams {
        &self.params
    }

    pub fn solver(&self) -> &KeplerSolver {
        &self.solver
    }

    /// Fluxes at every time in `times`.
    pub fn light_curve(&self, times: &[f64]) -> LightCurve {
        debug!(samples = times.len(), "evaluating light curve");

        #[cfg(feature = "parallel")]
        let samples: Vec<FluxSample> = times.par_iter().map(|&t| self.sample(t)).collect();
        #[cfg(not(feature = "parallel"))]
        let samples: Vec<FluxSample> = times.iter().map(|&t| self.sample(t)).collect();

        let companions = self.companions.len();
        let mut curve = LightCurve {
            times: times.to_vec(),
            total: Vec::with_capacity(samples.len()),
            per_body: vec![Vec::with_capacity(samples.len()); companions + 1],
            transits: vec![Vec::with_capacity(samples.len()); companions],
        };
        for sample in samples {
            curve.total.push(sample.total);
            for (series, v) in curve.per_body.iter_mut().zip(sample.per_body) {
                series.push(v);
            }
            for (series, v) in curve.transits.iter_mut().zip(sample.transits) {
                series.push(v);
            }
        }
        curve
    }

    /// Total flux only.
    pub fn flux(&self, times: &[f64]) -> Vec<f64> {
        #[cfg(feature = "parallel")]
        let flux = times.par_iter().map(|&t| self.sample(t).total).collect();
        #[cfg(not(feature = "parallel"))]
        let flux = times.iter().map(|&t| self.sample(t).total).collect();
        flux
    }

    /// Exposure-averaged fluxes around `t`.
    pub fn sample(&self, t: f64) -> FluxSample {
        if let [offset] = self.offsets.as_slice() {
            return self.instant(t + offset);
        }
        let weight = 1.0 / self.offsets.len() as f64;
        let mut sample = FluxSample::zeros(self.companions.len());
        for offset in &self.offsets {
            sample.accumulate(&self.instant(t + offset), weight);
        }
        sample
    }

    /// Fluxes at the instant `t`.
    pub fn instant(&self, t: f64) -> FluxSample {
        let central_body = self.system.central();
        let central_radius = central_body.radius();
        let origin = Vector3::zeros();

        let unocculted = self.central.flux(t, None);
        let mut central_flux = unocculted;
        let mut per_body = Vec::with_capacity(self.companions.len() + 1);
        let mut transits = Vec::with_capacity(self.companions.len());
        per_body.push(0.0);

        for (body, emitter) in self.system.bodies().iter().zip(&self.companions) {
            let position = body.elements().relative_position(t, &self.solver);

            let transit = OccultationGeometry::new(&origin, central_radius, &position, body.radius());
            let deficit = if transit.overlap.is_occulting() {
                self.central.flux(t, Some(&transit)) - unocculted
            } else {
                0.0
            };
            transits.push(deficit);
            central_flux += deficit;

            let eclipse = OccultationGeometry::new(&position, body.radius(), &origin, central_radius);
            let hidden = eclipse.overlap.is_occulting().then_some(&eclipse);
            per_body.push(emitter.flux(t, hidden));
        }

        per_body[0] = central_flux;
        FluxSample {
            total: per_body.iter().sum(),
            per_body,
            transits,
        }
    }
}

#[cfg(test)]
mod engine_test {
    use super::*;
    use crate::{
        orbit_type::OrbitalElements,
        starry::surface::SurfaceMap,
        system::{Body, Central},
    };
    use approx::assert_abs_diff_eq;

    fn star() -> Central {
        Central::new(1.0, 1.0)
            .unwrap()
            .with_limb_darkening(LimbDarkening::quadratic(0.1, 0.06).unwrap())
    }

    fn planet(central: &Central, impact_param: f64) -> Body {
        Body::new(
            OrbitalElements::builder()
                .period(3.0)
                .impact_param(impact_param)
                .radius(0.1)
                .build(central)
                .unwrap(),
        )
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LightCurveEngine>();
    }

    #[test]
    fn test_lonely_star_is_flat() {
        let engine = LightCurveEngine::new(System::new(star()), LightCurveParams::default()).unwrap();
        let curve = engine.light_curve(&[-1.0, 0.0, 2.5]);
        assert_eq!(curve.total, vec![1.0, 1.0, 1.0]);
        assert!(curve.transits.is_empty());
    }

    #[test]
    fn test_mid_transit_depth() {
        let central = star();
        let system = System::new(central.clone()).add_body(planet(&central, 0.3));
        let params = LightCurveParams::builder().order(50).build().unwrap();
        let engine = LightCurveEngine::new(system, params).unwrap();

        let reference = LimbDarkIntegrator::new(central.limb_darkening().clone(), 50).unwrap();
        let sample = engine.sample(0.0);
        assert_abs_diff_eq!(
            sample.total,
            1.0 - reference.occulted_fraction_at(0.3, 0.1),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(sample.transits[0], sample.total - 1.0, epsilon = 1e-15);
        // out of transit and behind the star
        assert_eq!(engine.sample(0.75).total, 1.0);
        assert_eq!(engine.sample(1.5).total, 1.0);
    }

    #[test]
    fn test_secondary_eclipse_removes_companion() {
        let central = star();
        let body = planet(&central, 0.0).with_amplitude(0.01);
        let system = System::new(central).add_body(body);
        let engine = LightCurveEngine::new(system, LightCurveParams::default()).unwrap();

        let eclipse = engine.sample(1.5);
        assert_abs_diff_eq!(eclipse.total, 1.0, epsilon = 1e-15);
        assert_eq!(eclipse.per_body[1], 0.0);
        let quadrature = engine.sample(0.75);
        assert_abs_diff_eq!(quadrature.total, 1.01, epsilon = 1e-15);
    }

    #[test]
    fn test_uniform_map_matches_limb_darkened_star() {
        let plain = star();
        let mapped = star().with_surface(Surface::new(SurfaceMap::uniform(2)));
        let params = LightCurveParams::builder().order(200).build().unwrap();
        let times: Vec<f64> = (0..41).map(|i| -0.08 + 0.004 * i as f64).collect();

        let curve = |central: Central| {
            let system = System::new(central.clone()).add_body(planet(&central, 0.6));
            LightCurveEngine::new(system, params.clone())
                .unwrap()
                .flux(&times)
        };
        for (a, b) in curve(plain).iter().zip(curve(mapped)) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_rotational_modulation() {
        // a Y₁₁ dipole spun about a sky-plane pole: F = 1 − c sin α · 2/√3
        let c = 0.2;
        let map = SurfaceMap::uniform(1).with(1, 1, c).unwrap();
        let surface = Surface::new(map).with_rotation_period(4.0).unwrap();
        let central = Central::new(1.0, 1.0).unwrap().with_surface(surface);
        let engine = LightCurveEngine::new(System::new(central), LightCurveParams::default()).unwrap();

        let flux = engine.flux(&[0.0, 1.0, 3.0, 5.0]);
        assert_abs_diff_eq!(flux[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(flux[1], 1.0 - c * 2.0 / 3.0_f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(flux[2], 1.0 + c * 2.0 / 3.0_f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(flux[3], flux[1], epsilon = 1e-12);
    }

    #[test]
    fn test_exposure_smooths_transit() {
        let central = star();
        let system = System::new(central.clone()).add_body(planet(&central, 0.3));
        let instant = LightCurveEngine::new(system.clone(), LightCurveParams::default()).unwrap();
        let params = LightCurveParams::builder()
            .exposure_time(0.1)
            .oversample(9)
            .build()
            .unwrap();
        let smeared = LightCurveEngine::new(system, params).unwrap();

        assert!(smeared.sample(0.0).total > instant.sample(0.0).total);
        assert_abs_diff_eq!(smeared.sample(1.0).total, 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_invalid_emitters() {
        let bad_map = SurfaceMap::new(vec![0.0, 0.0, 1.0, 0.0]).unwrap();
        let central = star().with_surface(Surface::new(bad_map));
        assert!(LightCurveEngine::new(System::new(central), LightCurveParams::default()).is_err());

        let central = star();
        let body = planet(&central, 0.1).with_amplitude(f64::NAN);
        let system = System::new(central.clone()).add_body(body);
        assert!(LightCurveEngine::new(system, LightCurveParams::default()).is_err());

        let body = planet(&central, 0.1).with_amplitude(-0.01);
        let system = System::new(central.clone()).add_body(body);
        assert!(matches!(
            LightCurveEngine::new(system, LightCurveParams::default()),
            Err(KeplightError::InvalidBody(_))
        ));
        let system = System::new(central.with_amplitude(-1.0));
        assert!(LightCurveEngine::new(system, LightCurveParams::default()).is_err());
    }

    #[test]
    fn test_fixed_surface_cache() {
        let law = LimbDarkening::quadratic(0.2, 0.1).unwrap();
        let map = SurfaceMap::uniform(2).with(1, 1, 0.3).unwrap().with(2, 0, -0.1).unwrap();
        let surface = Surface::new(map).with_inclination(1.1).with_phase(0.4);
        let cached = MappedEmitter::new(1.0, &law, &surface, 30).unwrap();
        assert!(cached.fixed.is_some());
        let mut uncached = cached.clone();
        uncached.fixed = None;

        for (b, r, theta) in [(0.3, 0.1, 0.2), (0.95, 0.2, -1.0), (0.2, 1.5, 0.0), (2.0, 0.1, 0.0)] {
            let (sin_t, cos_t) = f64::sin_cos(theta);
            let occultor = Vector3::new(b * cos_t, b * sin_t, 1.0);
            let geometry = OccultationGeometry::new(&Vector3::zeros(), 1.0, &occultor, r);
            assert_abs_diff_eq!(
                cached.flux(0.7, Some(&geometry)),
                uncached.flux(0.7, Some(&geometry)),
                epsilon = 1e-14
            );
        }
        assert_abs_diff_eq!(cached.flux(0.7, None), uncached.flux(0.7, None), epsilon = 1e-15);
    }
}
