//! Error type shared by the analysis pipeline.

use ab_config::ValidationError;
use ab_math::QuadratureError;
use thiserror::Error;

/// Errors raised while building posteriors or derived metrics.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("inconsistent observation: {0}")]
    InconsistentObservation(String),

    #[error(transparent)]
    Quadrature(#[from] QuadratureError),

    #[error(transparent)]
    Config(#[from] ValidationError),
}

impl CoreError {
    /// Error code for structured error reporting.
    ///
    /// Config errors keep the 60-range codes of `ValidationError`.
    pub fn code(&self) -> u32 {
        match self {
            CoreError::InvalidParameter { .. } => 70,
            CoreError::InconsistentObservation(_) => 71,
            CoreError::Quadrature(QuadratureError::Unstable { .. }) => 72,
            CoreError::Quadrature(_) => 73,
            CoreError::Config(e) => e.code(),
        }
    }
}

/// Result type for the analysis pipeline.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Fail unless `value` is finite and strictly positive.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CoreError::InvalidParameter { name, value })
    }
}

/// Fail unless `value` is finite.
pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoreError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let invalid = CoreError::InvalidParameter {
            name: "alpha",
            value: 0.0,
        };
        assert_eq!(invalid.code(), 70);
        assert_eq!(CoreError::InconsistentObservation("x".into()).code(), 71);

        let unstable: CoreError = QuadratureError::Unstable {
            family: "hermite",
            reason: "test".into(),
        }
        .into();
        assert_eq!(unstable.code(), 72);
        assert_eq!(CoreError::from(QuadratureError::ZeroNodes).code(), 73);

        let config: CoreError = ValidationError::ParseError("bad".into()).into();
        assert_eq!(config.code(), 61);
    }

    #[test]
    fn positivity_guard() {
        assert!(require_positive("sigma", 1e-300).is_ok());
        assert!(require_positive("sigma", 0.0).is_err());
        assert!(require_positive("sigma", f64::INFINITY).is_err());
        assert!(require_finite("mu", -3.0).is_ok());
        assert!(require_finite("mu", f64::NAN).is_err());
    }
}
