//! # Two-body orbits
//!
//! This module holds the orbital description of one companion around the
//! central body:
//!
//! - [`keplerian_element`](crate::orbit_type::keplerian_element): Resolved Keplerian elements
//!   `(P, a, e, i, ω, Ω, t₀, t_p)` and the validating [`OrbitalElementsBuilder`].
//! - [`orbital_state`](crate::orbit_type::orbital_state): Position, velocity and radial
//!   velocity at a given time, relative and barycentric.
//!
//! ## Typical workflow
//!
//! ```rust, no_run
//! use keplight::kepler::KeplerSolver;
//! use keplight::orbit_type::OrbitalElements;
//! use keplight::system::Central;
//!
//! let star = Central::new(1.0, 1.0).unwrap();
//! let orbit = OrbitalElements::builder()
//!     .period(3.0)
//!     .impact_param(0.2)
//!     .mass(1e-3)
//!     .build(&star)
//!     .unwrap();
//!
//! let state = orbit.relative_state(0.1, &KeplerSolver::default());
//! println!("sky separation = {}", state.projected_separation());
//! println!("RV = {} m/s", orbit.radial_velocity(0.1, &KeplerSolver::default()));
//! ```

/// Resolved Keplerian elements and their builder.
pub mod keplerian_element;

/// Cartesian states derived from the elements.
pub mod orbital_state;

pub use keplerian_element::{OrbitalElements, OrbitalElementsBuilder};
pub use orbital_state::{OrbitalState, Trajectory};
