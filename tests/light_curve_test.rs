mod common;

use approx::assert_abs_diff_eq;
use common::{
    assert_series_close, linspace, occulted_fraction_by_quadrature, quadratic_star,
    single_planet_system,
};
use keplight::light_curve::{engine::LightCurveEngine, LightCurveParams};
use keplight::occultation::{
    geometry::OccultationGeometry, limb_dark::LimbDarkening, quadrature::GaussLegendre,
};
use keplight::orbit_type::OrbitalElements;
use keplight::starry::surface::{Surface, SurfaceMap};
use keplight::system::{Body, Central, System};
use nalgebra::Vector3;

fn two_planets(central: &Central, inner_radius: f64) -> System {
    [(0.0, 1.0, 0.5, inner_radius), (0.5, 4.5, 0.2, 0.3)]
        .iter()
        .fold(System::new(central.clone()), |system, &(t0, period, b, r)| {
            system.add_body(Body::new(
                OrbitalElements::builder()
                    .time_transit(t0)
                    .period(period)
                    .impact_param(b)
                    .radius(r)
                    .build(central)
                    .unwrap(),
            ))
        })
}

#[test]
fn test_single_symmetric_dip() {
    let engine =
        LightCurveEngine::new(single_planet_system(quadratic_star()), LightCurveParams::default())
            .unwrap();
    let times = linspace(-0.2, 0.2, 401);
    let curve = engine.light_curve(&times);

    // deepest point at t0
    assert_eq!(curve.minimum(), Some(200));
    let depth = 1.0 - curve.total[200];
    assert!(depth > 0.009 && depth < 0.012, "depth = {depth}");

    for k in 1..=200 {
        assert_abs_diff_eq!(curve.total[200 - k], curve.total[200 + k], epsilon = 1e-10);
    }

    // one contiguous dip, flat outside the transit window
    let in_transit: Vec<usize> = (0..times.len()).filter(|&i| curve.total[i] < 1.0).collect();
    let first = in_transit[0];
    let last = in_transit[in_transit.len() - 1];
    assert_eq!(last - first + 1, in_transit.len());
    for (t, f) in times.iter().zip(&curve.total) {
        if t.abs() > 0.065 {
            assert_eq!(*f, 1.0);
        }
    }

    for i in first..200 {
        assert!(curve.total[i + 1] <= curve.total[i]);
    }
}

#[test]
fn test_multi_planet_deficits_match_single_planets() {
    let times = linspace(-1.0, 10.0, 1000);
    let star = Central::new(0.98, 0.93)
        .unwrap()
        .with_limb_darkening(LimbDarkening::quadratic(0.1, 0.3).unwrap());
    let params = LightCurveParams::default();

    let both = two_planets(&star, 0.1);
    let curve_both = LightCurveEngine::new(both.clone(), params.clone())
        .unwrap()
        .light_curve(&times);

    for (n, planet) in both.bodies().iter().enumerate() {
        let single = System::new(star.clone()).add_body(planet.clone());
        let curve = LightCurveEngine::new(single, params.clone())
            .unwrap()
            .light_curve(&times);
        assert_series_close(&curve.transits[0], &curve_both.transits[n], 1e-12);
        assert!(curve.transits[0].iter().any(|d| *d < 0.0));
    }
}

#[test]
fn test_quadratic_law_matches_quadrature() {
    let times = linspace(-1.0, 10.0, 1000);
    let star = Central::new(0.98, 0.93).unwrap();
    let quadrature = GaussLegendre::new(1500).unwrap();

    for radius in [0.01, 0.1, 1.0, 1.5] {
        for ld_order in 0..=2usize {
            let u = [0.1, 0.3];
            let law = LimbDarkening::new(&u[..ld_order]).unwrap();
            let central = star.clone().with_limb_darkening(law.clone());
            let system = two_planets(&central, radius);
            let engine = LightCurveEngine::new(system.clone(), LightCurveParams::default()).unwrap();
            let closed_form = engine.flux(&times);

            // the same light curve with every power of μ left to the quadrature
            let reference: Vec<f64> = times
                .iter()
                .map(|&t| {
                    let deficit: f64 = system
                        .bodies()
                        .iter()
                        .map(|body| {
                            let position = body.elements().relative_position(t, engine.solver());
                            let geometry = OccultationGeometry::new(
                                &Vector3::zeros(),
                                central.radius(),
                                &position,
                                body.radius(),
                            );
                            occulted_fraction_by_quadrature(&law, &geometry.overlap, &quadrature)
                        })
                        .sum();
                    1.0 - deficit
                })
                .collect();

            assert!(closed_form.iter().any(|f| *f < 1.0));
            assert_series_close(&closed_form, &reference, 1e-9);
        }
    }
}

#[test]
fn test_uniform_map_matches_limb_darkened_path() {
    let times = linspace(-0.1, 0.1, 201);
    let params = LightCurveParams::builder().order(200).build().unwrap();

    let plain = LightCurveEngine::new(single_planet_system(quadratic_star()), params.clone())
        .unwrap()
        .flux(&times);
    let mapped_star = quadratic_star().with_surface(
        Surface::new(SurfaceMap::uniform(3))
            .with_inclination(0.4)
            .with_rotation_period(2.0)
            .unwrap(),
    );
    let mapped = LightCurveEngine::new(single_planet_system(mapped_star), params)
        .unwrap()
        .flux(&times);

    assert_series_close(&plain, &mapped, 1e-7);
    assert_abs_diff_eq!(mapped[0], 1.0, epsilon = 1e-13);
}

#[test]
fn test_exposure_is_average_of_sub_exposures() {
    let system = single_planet_system(quadratic_star());
    let params = LightCurveParams::builder()
        .exposure_time(0.02)
        .oversample(5)
        .build()
        .unwrap();
    let offsets = params.exposure_offsets();
    let integrated = LightCurveEngine::new(system.clone(), params).unwrap();
    let instant = LightCurveEngine::new(system, LightCurveParams::default()).unwrap();

    for t in linspace(-0.08, 0.08, 17) {
        let expected = offsets
            .iter()
            .map(|dt| instant.sample(t + dt).total)
            .sum::<f64>()
            / offsets.len() as f64;
        assert_abs_diff_eq!(integrated.sample(t).total, expected, epsilon = 1e-14);
    }
}

#[test]
fn test_per_body_fluxes_sum_to_total() {
    let star = quadratic_star();
    let planet = common::hot_jupiter(&star)
        .with_amplitude(0.002)
        .with_limb_darkening(LimbDarkening::new(&[0.3]).unwrap());
    let system = System::new(star).add_body(planet);
    let curve = LightCurveEngine::new(system, LightCurveParams::default())
        .unwrap()
        .light_curve(&linspace(-0.5, 3.5, 401));

    assert_eq!(curve.len(), 401);
    assert_eq!(curve.per_body.len(), 2);
    for i in 0..curve.len() {
        let sum: f64 = curve.per_body.iter().map(|series| series[i]).sum();
        assert_abs_diff_eq!(sum, curve.total[i], epsilon = 1e-15);
        assert_abs_diff_eq!(curve.central()[i], 1.0 + curve.transits[0][i], epsilon = 1e-15);
    }

    // t0 + P/2 = 1.5 is sample 200: the star hides the planet entirely
    assert_abs_diff_eq!(curve.times[200], 1.5, epsilon = 1e-12);
    assert_eq!(curve.per_body[1][200], 0.0);
    assert_abs_diff_eq!(curve.per_body[1][100], 0.002, epsilon = 1e-15);
}
