#![allow(dead_code)]

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use keplight::occultation::{geometry::Overlap, limb_dark::LimbDarkening, quadrature::GaussLegendre};
use keplight::orbit_type::OrbitalElements;
use keplight::system::{Body, Central, System};

pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Sun-like star with the quadratic law `u = (0.1, 0.06)`.
pub fn quadratic_star() -> Central {
    Central::new(1.0, 1.0)
        .unwrap()
        .with_limb_darkening(LimbDarkening::quadratic(0.1, 0.06).unwrap())
}

/// Circular 3-day orbit with a 0.12-day transit at `t = 0`, radius ratio 0.1.
pub fn hot_jupiter(central: &Central) -> Body {
    Body::new(
        OrbitalElements::builder()
            .period(3.0)
            .duration(0.12)
            .radius(0.1 * central.radius())
            .build(central)
            .unwrap(),
    )
}

pub fn single_planet_system(central: Central) -> System {
    let planet = hot_jupiter(&central);
    System::new(central).add_body(planet)
}

pub fn assert_series_close(actual: &[f64], expected: &[f64], epsilon: f64) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_abs_diff_eq!(*a, *e, epsilon = epsilon);
    }
}

/// `ΔF/F₀` of `law` by Gauss–Legendre over radius alone, no closed forms.
pub fn occulted_fraction_by_quadrature(
    law: &LimbDarkening,
    overlap: &Overlap,
    quadrature: &GaussLegendre,
) -> f64 {
    let (b, r) = match *overlap {
        Overlap::None => return 0.0,
        Overlap::Full => return 1.0,
        Overlap::Interior { b, r } | Overlap::Partial { b, r, .. } => (b, r),
    };
    let intensity = |rho: f64| law.intensity((1.0 - rho * rho).max(0.0).sqrt());

    let inner = (r - b).max(0.0);
    let mut flux = quadrature.integrate(0.0, inner, |rho| 2.0 * PI * rho * intensity(rho));
    let (lower, upper) = ((b - r).abs(), (b + r).min(1.0));
    if b > 0.0 && upper > lower {
        flux += quadrature.integrate(lower, upper, |rho| {
            let cos_alpha = ((rho * rho + b * b - r * r) / (2.0 * rho * b)).clamp(-1.0, 1.0);
            2.0 * cos_alpha.acos() * rho * intensity(rho)
        });
    }
    flux / law.total_flux()
}
