//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::experiment::{
    BernoulliExponentialSample, BetaParams, BinomialObservation, ExperimentConfig, GammaParams,
    NormalParams, SampleStats,
};

/// Largest quadrature rule an experiment may request.
pub const MAX_QUADRATURE_NODES: usize = 256;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate an experiment configuration semantically.
pub fn validate_experiment(config: &ExperimentConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_beta_params("conversion.prior", &config.conversion.prior)?;
    validate_binomial("conversion.a", &config.conversion.a)?;
    validate_binomial("conversion.b", &config.conversion.b)?;

    validate_normal_params("revenue.prior", &config.revenue.prior)?;
    validate_sample_stats("revenue.a", &config.revenue.a)?;
    validate_sample_stats("revenue.b", &config.revenue.b)?;

    if let Some(ref compound) = config.compound {
        validate_beta_params("compound.rate_prior", &compound.rate_prior)?;
        validate_gamma_params("compound.magnitude_prior", &compound.magnitude_prior)?;
        validate_sample("compound.a", &compound.a)?;
        validate_sample("compound.b", &compound.b)?;
    }

    let nodes = config.quadrature.nodes;
    if nodes == 0 || nodes > MAX_QUADRATURE_NODES {
        return Err(ValidationError::InvalidValue {
            field: "quadrature.nodes".to_string(),
            message: format!("Must be in [1, {}], got {}", MAX_QUADRATURE_NODES, nodes),
        });
    }

    let level = config.report.credible_level;
    if !(level > 0.0 && level < 1.0) {
        return Err(ValidationError::InvalidValue {
            field: "report.credible_level".to_string(),
            message: format!("Must be in (0, 1), got {}", level),
        });
    }
    require_positive("report.downside_ratio", config.report.downside_ratio)?;

    Ok(())
}

fn require_positive(field: &str, value: f64) -> ValidationResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be positive and finite, got {}", value),
        })
    }
}

fn require_finite(field: &str, value: f64) -> ValidationResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be finite, got {}", value),
        })
    }
}

/// Validate Beta distribution parameters.
fn validate_beta_params(field: &str, params: &BetaParams) -> ValidationResult<()> {
    require_positive(&format!("{}.alpha", field), params.alpha)?;
    require_positive(&format!("{}.beta", field), params.beta)
}

/// Validate Normal prior parameters.
fn validate_normal_params(field: &str, params: &NormalParams) -> ValidationResult<()> {
    require_finite(&format!("{}.mu", field), params.mu)?;
    require_positive(&format!("{}.sigma", field), params.sigma)?;
    require_positive(&format!("{}.weight", field), params.weight)
}

/// Validate Gamma distribution parameters.
fn validate_gamma_params(field: &str, params: &GammaParams) -> ValidationResult<()> {
    require_positive(&format!("{}.shape", field), params.shape)?;
    require_positive(&format!("{}.scale", field), params.scale)
}

fn validate_binomial(field: &str, obs: &BinomialObservation) -> ValidationResult<()> {
    if obs.successes > obs.trials {
        return Err(ValidationError::SemanticError(format!(
            "{}: successes ({}) exceed trials ({})",
            field, obs.successes, obs.trials
        )));
    }
    Ok(())
}

fn validate_sample_stats(field: &str, stats: &SampleStats) -> ValidationResult<()> {
    require_finite(&format!("{}.mean", field), stats.mean)?;
    require_positive(&format!("{}.sd", field), stats.sd)?;
    if stats.n == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.n", field),
            message: "Must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_sample(field: &str, sample: &BernoulliExponentialSample) -> ValidationResult<()> {
    if sample.indicators.len() != sample.magnitudes.len() {
        return Err(ValidationError::SemanticError(format!(
            "{}: {} indicators but {} magnitudes",
            field,
            sample.indicators.len(),
            sample.magnitudes.len()
        )));
    }
    if let Some(pos) = sample.indicators.iter().position(|&i| i > 1) {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.indicators[{}]", field, pos),
            message: format!("Must be 0 or 1, got {}", sample.indicators[pos]),
        });
    }
    if let Some(pos) = sample
        .magnitudes
        .iter()
        .position(|m| !m.is_finite() || *m < 0.0)
    {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.magnitudes[{}]", field, pos),
            message: format!("Must be non-negative, got {}", sample.magnitudes[pos]),
        });
    }
    Ok(())
}
