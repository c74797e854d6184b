use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeplightError {
    #[error("Eccentricity must lie in [0, 1), got {0}")]
    InvalidEccentricity(f64),

    #[error("Invalid orbital elements: {0}")]
    InvalidOrbitalElements(String),

    #[error("Invalid body: {0}")]
    InvalidBody(String),

    #[error("Invalid limb darkening law: {0}")]
    InvalidLimbDarkening(String),

    #[error("Invalid surface map: {0}")]
    InvalidSurfaceMap(String),

    #[error("Invalid light curve parameter: {0}")]
    InvalidLightCurveParameter(String),

    #[error("Quadrature order must be >= 1, got {0}")]
    InvalidQuadratureOrder(usize),

    #[error("Basis transform could not be inverted: {0}")]
    SingularBasisTransform(String),

    #[error("No companion body at index {0}")]
    BodyIndexOutOfRange(usize),
}
