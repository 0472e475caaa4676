//! A/B Analysis Core Library
//!
//! Bayesian two-variant analysis:
//! - Conjugate posterior updates (Beta-Binomial, Normal precision fusion, Gamma-Beta)
//! - Delta-method summaries of differences and ratios
//! - Expected-loss risk by Gauss quadrature
//! - Compound Bernoulli × Exponential moment matching
//! - Seeded Monte Carlo cross-checks
//!
//! The binary entry point is in `main.rs`.

pub mod analysis;
pub mod error;
pub mod exit_codes;
pub mod inference;
pub mod logging;
pub mod validation;

pub use analysis::{analyze, AnalysisOptions, AnalysisReport};
pub use error::{CoreError, Result};
