pub mod constants;
pub mod kepler;
pub mod keplight_errors;
pub mod light_curve;
pub mod occultation;
pub mod orbit_type;
pub mod starry;
pub mod system;
