//! Error types shared across the crate.

use thiserror::Error;

use crate::variography::model_variograms::iso_fitter::FitError;

/// Structural failures that abort a call.
///
/// Per-unit failures (a single lag, kriging target or simulation step) are not reported
/// through this type; they degrade to NaN sentinels and error tags on the results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeostatError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("unknown {kind}: `{name}`")]
    Config { kind: &'static str, name: String },

    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("no conditioning points: {0}")]
    Resource(String),

    #[error("{0} has not been fitted")]
    NotFitted(&'static str),

    #[error("variogram fit failed: {0}")]
    Fit(#[from] FitError),
}

impl GeostatError {
    pub(crate) fn unknown(kind: &'static str, name: &str) -> Self {
        GeostatError::Config {
            kind,
            name: name.to_string(),
        }
    }
}

/// Result type alias for geostat operations
pub type Result<T> = std::result::Result<T, GeostatError>;
