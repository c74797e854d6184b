//! # Occultations of limb-darkened disks
//!
//! - [`geometry`](crate::occultation::geometry): Sky-plane overlap classification
//!   ([`Overlap`](crate::occultation::geometry::Overlap)) between an occulted disk
//!   and a circular occultor.
//! - [`quadrature`](crate::occultation::quadrature): Gauss–Legendre tables and exact
//!   trigonometric power integrals shared with the spherical-harmonic path.
//! - [`elliptic`](crate::occultation::elliptic): Bulirsch's complete elliptic
//!   integral behind the closed-form linear limb-darkening term.
//! - [`limb_dark`](crate::occultation::limb_dark): Polynomial limb-darkening laws and
//!   their occulted flux.
//!
//! ## Example
//!
//! ```rust, no_run
//! use keplight::occultation::geometry::Overlap;
//! use keplight::occultation::limb_dark::{LimbDarkIntegrator, LimbDarkening};
//!
//! let law = LimbDarkening::quadratic(0.1, 0.06).unwrap();
//! let integrator = LimbDarkIntegrator::new(law, 10).unwrap();
//! let depth = integrator.occulted_fraction(&Overlap::classify(0.3, 0.1));
//! println!("depth = {depth}");
//! ```

/// Complete elliptic integrals.
pub mod elliptic;

/// Overlap classification.
pub mod geometry;

/// Limb-darkened occultation flux.
pub mod limb_dark;

/// Numerical integration helpers.
pub mod quadrature;
