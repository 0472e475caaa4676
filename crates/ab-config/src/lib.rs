//! Bayesian A/B experiment configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for experiment.json (priors and observed data)
//! - Config resolution (CLI → env → XDG → built-in example)
//! - Semantic validation

pub mod experiment;
pub mod resolve;
pub mod validate;

pub use experiment::{
    BernoulliExponentialSample, BetaParams, BinomialObservation, CompoundSection,
    ConversionSection, ExperimentConfig, GammaParams, NormalParams, Observation, PriorSpec,
    QuadratureSettings, ReportSettings, RevenueSection, SampleStats,
};
pub use resolve::{load_experiment, resolve_experiment_path, ConfigSource};
pub use validate::{validate_experiment, ValidationError, ValidationResult};

/// Schema version for experiment files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
