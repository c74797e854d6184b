//! # Constants and type definitions for keplight
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **unit
//! aliases** used throughout the crate.
//!
//! ## Units
//!
//! The whole core works in a single consistent unit system, established by the caller:
//!
//! - Lengths: **solar radii** (R☉)
//! - Masses: **solar masses** (M☉)
//! - Time: **days**
//! - Angles: **radians**
//!
//! Radial velocities are the only quantity converted on output (to m/s), see
//! [`RSUN_PER_DAY_TO_M_PER_S`].

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Nominal solar radius in meters (IAU 2015 B3)
pub const RSUN_M: f64 = 6.957e8;

/// Gravitational constant in R☉³ · M☉⁻¹ · day⁻²
pub const G_GRAV: f64 = 2942.2062175044193;

/// Velocity conversion R☉/day → m/s
pub const RSUN_PER_DAY_TO_M_PER_S: f64 = RSUN_M / SECONDS_PER_DAY;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in radians
pub type Radian = f64;
/// Time in days
pub type Day = f64;
/// Length in solar radii
pub type SolarRadius = f64;
/// Mass in solar masses
pub type SolarMass = f64;
