//! Compound Bernoulli × Exponential model.
//!
//! # Model
//!
//! Each user converts with probability `r` and, given a conversion, spends an
//! amount drawn from an Exponential with mean `s`. The per-user value is
//! `indicator · magnitude`, so its mean is `r·s`.
//!
//! - `r ~ Beta(α, β)`
//! - `s ~ Gamma(k, θ)` (scale form)
//!
//! The exact posterior of `r·s` has no convenient quantiles, so it is
//! replaced by a Normal: the prior product moments
//! `E[r]E[s]` and `E[r²]E[s²] - (E[r]E[s])²` are fused with the sample mean
//! and variance of the observed values by inverse-variance weighting.

use ab_config::{BernoulliExponentialSample, CompoundSection};
use serde::Serialize;
use tracing::debug;

use super::posterior::{
    update_gamma_beta, update_normal_by_precision_fusion, BetaPosterior, GammaPosterior,
    Marginal, NormalEstimate, NormalPosterior,
};
use crate::error::{CoreError, Result};

/// Priors on the event rate and on the Exponential mean of the magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompoundPrior {
    pub rate: BetaPosterior,
    pub magnitude: GammaPosterior,
}

/// First two moments of the prior product `r·s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductMoments {
    pub mean: f64,
    pub second_moment: f64,
    pub variance: f64,
}

/// Fitted compound posterior for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompoundPosterior {
    /// Posterior on the event rate.
    pub rate: BetaPosterior,
    /// Posterior on the Exponential rate of the magnitude.
    pub exponential_rate: GammaPosterior,
    /// Normal approximation of the mean per-user value.
    pub fused: NormalPosterior,
    pub prior_mean: f64,
    pub prior_variance: f64,
    pub sample_mean: f64,
    /// Population (ddof 0) variance of the per-user values.
    pub sample_variance: f64,
    pub sample_size: usize,
}

impl CompoundPrior {
    pub fn new(rate: BetaPosterior, magnitude: GammaPosterior) -> Self {
        Self { rate, magnitude }
    }

    /// `Beta(20, 80)` conversion rate, `Gamma(5, scale = 20)` mean spend.
    pub fn reference() -> Result<Self> {
        Ok(Self::new(
            BetaPosterior::new(20.0, 80.0)?,
            GammaPosterior::new(5.0, 20.0)?,
        ))
    }

    pub fn from_config(section: &CompoundSection) -> Result<Self> {
        Ok(Self::new(
            BetaPosterior::from_prior(&section.rate_prior)?,
            GammaPosterior::from_prior(&section.magnitude_prior)?,
        ))
    }

    pub fn prior_moments(&self) -> ProductMoments {
        let mean = self.rate.mean() * self.magnitude.mean();
        let second_moment = self.rate.second_moment() * self.magnitude.second_moment();
        ProductMoments {
            mean,
            second_moment,
            variance: second_moment - mean * mean,
        }
    }

    /// Fit one variant's observed sample.
    pub fn fit(&self, sample: &BernoulliExponentialSample) -> Result<CompoundPosterior> {
        let (rate, exponential_rate) = update_gamma_beta(self.rate, self.magnitude, sample)?;

        let n = sample.len();
        if n == 0 {
            return Err(CoreError::InconsistentObservation(
                "compound sample is empty".to_string(),
            ));
        }
        let (sample_mean, sample_variance) = mean_and_variance(sample.values(), n);
        if sample_variance <= 0.0 {
            return Err(CoreError::InconsistentObservation(format!(
                "compound sample of {} rows has zero variance",
                n
            )));
        }

        let prior = self.prior_moments();
        let fused = update_normal_by_precision_fusion(&[
            NormalEstimate::new(prior.mean, prior.variance, 1.0),
            NormalEstimate::new(sample_mean, sample_variance, n as f64),
        ])?;

        debug!(
            rows = n,
            prior_mean = prior.mean,
            sample_mean,
            fused_mean = fused.mu(),
            fused_sd = fused.sigma(),
            "compound fit"
        );

        Ok(CompoundPosterior {
            rate,
            exponential_rate,
            fused,
            prior_mean: prior.mean,
            prior_variance: prior.variance,
            sample_mean,
            sample_variance,
            sample_size: n,
        })
    }
}

/// Mean and population variance, two-pass.
fn mean_and_variance(values: impl Iterator<Item = f64> + Clone, n: usize) -> (f64, f64) {
    let count = n as f64;
    let mean = values.clone().sum::<f64>() / count;
    let variance = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
    (mean, variance)
}
