//! Posterior distributions and conjugate updates.
//!
//! Three families cover the analysis:
//! - `BetaPosterior` for conversion rates (Beta-Binomial, exact conjugacy)
//! - `NormalPosterior` for per-user means (precision-weighted fusion)
//! - `GammaPosterior` for the Exponential rate of the compound model
//!
//! Values are immutable and only reachable through validating constructors,
//! so every shape, scale and sd parameter is strictly positive.

use ab_config::{
    BernoulliExponentialSample, BetaParams, BinomialObservation, GammaParams, NormalParams,
    Observation, PriorSpec, SampleStats,
};
use ab_math::{
    beta_cdf, beta_log_mean, beta_log_var, beta_mean, beta_second_moment, beta_var, gamma_cdf,
    gamma_mean, gamma_second_moment, gamma_var, hermite_normal, normal_cdf, shifted_jacobi,
    QuadratureError, QuadratureRule,
};
use serde::Serialize;
use tracing::debug;

use crate::error::{require_finite, require_positive, CoreError, Result};

/// A one-dimensional posterior with the moments and CDF the risk estimator needs.
pub trait Marginal {
    fn mean(&self) -> f64;

    fn variance(&self) -> f64;

    fn cdf(&self, x: f64) -> f64;

    /// Gauss rule whose weight function is this distribution's density.
    fn quadrature(&self, nodes: usize) -> std::result::Result<QuadratureRule, QuadratureError>;

    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Moments of `log X`, used by the log-ratio composer.
pub trait LogMoments {
    fn log_mean(&self) -> f64;

    fn log_variance(&self) -> f64;
}

/// Beta(alpha, beta) posterior on a rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BetaPosterior {
    alpha: f64,
    beta: f64,
}

impl BetaPosterior {
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        Ok(Self {
            alpha: require_positive("alpha", alpha)?,
            beta: require_positive("beta", beta)?,
        })
    }

    pub fn from_prior(prior: &BetaParams) -> Result<Self> {
        Self::new(prior.alpha, prior.beta)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Raw second moment E[X²].
    pub fn second_moment(&self) -> f64 {
        beta_second_moment(self.alpha, self.beta)
    }
}

impl Marginal for BetaPosterior {
    fn mean(&self) -> f64 {
        beta_mean(self.alpha, self.beta)
    }

    fn variance(&self) -> f64 {
        beta_var(self.alpha, self.beta)
    }

    fn cdf(&self, x: f64) -> f64 {
        beta_cdf(x, self.alpha, self.beta)
    }

    fn quadrature(&self, nodes: usize) -> std::result::Result<QuadratureRule, QuadratureError> {
        shifted_jacobi(nodes, self.alpha, self.beta)
    }
}

impl LogMoments for BetaPosterior {
    fn log_mean(&self) -> f64 {
        beta_log_mean(self.alpha, self.beta)
    }

    fn log_variance(&self) -> f64 {
        beta_log_var(self.alpha, self.beta)
    }
}

/// Normal(mu, sigma) posterior on a mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalPosterior {
    mu: f64,
    sigma: f64,
}

impl NormalPosterior {
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        Ok(Self {
            mu: require_finite("mu", mu)?,
            sigma: require_positive("sigma", sigma)?,
        })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Marginal for NormalPosterior {
    fn mean(&self) -> f64 {
        self.mu
    }

    fn variance(&self) -> f64 {
        self.sigma * self.sigma
    }

    fn cdf(&self, x: f64) -> f64 {
        normal_cdf(x, self.mu, self.sigma)
    }

    fn quadrature(&self, nodes: usize) -> std::result::Result<QuadratureRule, QuadratureError> {
        hermite_normal(nodes, self.mu, self.sigma)
    }
}

impl LogMoments for NormalPosterior {
    /// First-order delta approximation; only meaningful for `mu > 0`.
    fn log_mean(&self) -> f64 {
        self.mu.ln()
    }

    fn log_variance(&self) -> f64 {
        let cv = self.sigma / self.mu;
        cv * cv
    }
}

/// Gamma(shape, scale) posterior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GammaPosterior {
    shape: f64,
    scale: f64,
}

impl GammaPosterior {
    pub fn new(shape: f64, scale: f64) -> Result<Self> {
        Ok(Self {
            shape: require_positive("shape", shape)?,
            scale: require_positive("scale", scale)?,
        })
    }

    pub fn from_prior(prior: &GammaParams) -> Result<Self> {
        Self::new(prior.shape, prior.scale)
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn mean(&self) -> f64 {
        gamma_mean(self.shape, self.scale)
    }

    pub fn variance(&self) -> f64 {
        gamma_var(self.shape, self.scale)
    }

    /// Raw second moment E[T²].
    pub fn second_moment(&self) -> f64 {
        gamma_second_moment(self.shape, self.scale)
    }

    pub fn cdf(&self, t: f64) -> f64 {
        gamma_cdf(t, self.shape, self.scale)
    }
}

/// Posterior tagged by family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum PosteriorDistribution {
    Beta(BetaPosterior),
    Normal(NormalPosterior),
    Gamma(GammaPosterior),
}

impl From<BetaPosterior> for PosteriorDistribution {
    fn from(p: BetaPosterior) -> Self {
        PosteriorDistribution::Beta(p)
    }
}

impl From<NormalPosterior> for PosteriorDistribution {
    fn from(p: NormalPosterior) -> Self {
        PosteriorDistribution::Normal(p)
    }
}

impl From<GammaPosterior> for PosteriorDistribution {
    fn from(p: GammaPosterior) -> Self {
        PosteriorDistribution::Gamma(p)
    }
}

/// One independent Normal measurement of an unknown mean.
///
/// `variance / weight` is the variance of the measurement itself: a sample
/// mean over `n` users with per-user variance `s²` is `(mean, s², n)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalEstimate {
    pub mean: f64,
    pub variance: f64,
    pub weight: f64,
}

impl NormalEstimate {
    pub fn new(mean: f64, variance: f64, weight: f64) -> Self {
        Self {
            mean,
            variance,
            weight,
        }
    }

    /// Prior belief `Normal(mu, sigma)` worth `weight` observations.
    pub fn from_prior(prior: &NormalParams) -> Self {
        Self::new(prior.mu, prior.sigma * prior.sigma, prior.weight)
    }

    pub fn from_sample(stats: &SampleStats) -> Self {
        Self::new(stats.mean, stats.sd * stats.sd, stats.n as f64)
    }

    fn precision(&self) -> Result<f64> {
        require_finite("mean", self.mean)?;
        let variance = require_positive("variance", self.variance)?;
        let weight = require_positive("weight", self.weight)?;
        Ok(weight / variance)
    }
}

/// Beta-Binomial update: `Beta(α + k, β + n - k)`.
pub fn update_beta(prior: BetaPosterior, obs: &BinomialObservation) -> Result<BetaPosterior> {
    if obs.successes > obs.trials {
        return Err(CoreError::InconsistentObservation(format!(
            "successes ({}) exceed trials ({})",
            obs.successes, obs.trials
        )));
    }
    let failures = obs.trials - obs.successes;
    BetaPosterior::new(
        prior.alpha + obs.successes as f64,
        prior.beta + failures as f64,
    )
}

/// Inverse-variance fusion of independent Normal estimates of one mean.
///
/// `μ' = Σ wᵢμᵢ / Σ wᵢ`, `σ' = 1/√Σ wᵢ` with `wᵢ = weightᵢ / varianceᵢ`.
pub fn update_normal_by_precision_fusion(estimates: &[NormalEstimate]) -> Result<NormalPosterior> {
    if estimates.is_empty() {
        return Err(CoreError::InconsistentObservation(
            "precision fusion needs at least one estimate".to_string(),
        ));
    }

    let mut total_precision = 0.0;
    let mut weighted_sum = 0.0;
    for estimate in estimates {
        let w = estimate.precision()?;
        total_precision += w;
        weighted_sum += w * estimate.mean;
    }

    NormalPosterior::new(weighted_sum / total_precision, total_precision.sqrt().recip())
}

/// Normal prior fused with one variant's sample statistics.
pub fn update_normal(prior: &NormalParams, stats: &SampleStats) -> Result<NormalPosterior> {
    if stats.n == 0 {
        return Err(CoreError::InconsistentObservation(
            "sample statistics over zero users".to_string(),
        ));
    }
    update_normal_by_precision_fusion(&[
        NormalEstimate::from_prior(prior),
        NormalEstimate::from_sample(stats),
    ])
}

fn check_sample(sample: &BernoulliExponentialSample) -> Result<()> {
    if sample.indicators.len() != sample.magnitudes.len() {
        return Err(CoreError::InconsistentObservation(format!(
            "{} indicators but {} magnitudes",
            sample.indicators.len(),
            sample.magnitudes.len()
        )));
    }
    if let Some(&bad) = sample.indicators.iter().find(|&&i| i > 1) {
        return Err(CoreError::InconsistentObservation(format!(
            "indicator {} is not 0 or 1",
            bad
        )));
    }
    if let Some(&bad) = sample.magnitudes.iter().find(|m| !m.is_finite() || **m < 0.0) {
        return Err(CoreError::InconsistentObservation(format!(
            "magnitude {} is not a non-negative number",
            bad
        )));
    }
    Ok(())
}

/// Event-rate half of the compound update: `Beta(α + k, β + m - k)`.
fn update_rate(prior: BetaPosterior, sample: &BernoulliExponentialSample) -> Result<BetaPosterior> {
    let events = sample.events();
    update_beta(
        prior,
        &BinomialObservation {
            successes: events,
            trials: sample.len() as u64,
        },
    )
}

/// Exponential-rate half: `Gamma(shape + k, 1/(1/scale + Σ indicator·magnitude))`.
///
/// Rows without an event contribute zero magnitude.
fn update_exponential_rate(
    prior: GammaPosterior,
    sample: &BernoulliExponentialSample,
) -> Result<GammaPosterior> {
    let events = sample.events() as f64;
    let total: f64 = sample.values().sum();
    GammaPosterior::new(prior.shape + events, (prior.scale.recip() + total).recip())
}

/// Compound Bernoulli × Exponential update.
pub fn update_gamma_beta(
    rate_prior: BetaPosterior,
    magnitude_prior: GammaPosterior,
    sample: &BernoulliExponentialSample,
) -> Result<(BetaPosterior, GammaPosterior)> {
    check_sample(sample)?;
    let rate = update_rate(rate_prior, sample)?;
    let exponential_rate = update_exponential_rate(magnitude_prior, sample)?;
    debug!(
        rows = sample.len(),
        events = sample.events(),
        alpha = rate.alpha,
        beta = rate.beta,
        shape = exponential_rate.shape,
        scale = exponential_rate.scale,
        "compound update"
    );
    Ok((rate, exponential_rate))
}

/// Update any prior with data of a kind it can absorb.
pub fn update(prior: &PriorSpec, obs: &Observation) -> Result<PosteriorDistribution> {
    match (prior, obs) {
        (PriorSpec::Beta(p), Observation::Binomial(o)) => {
            Ok(update_beta(BetaPosterior::from_prior(p)?, o)?.into())
        }
        (PriorSpec::Beta(p), Observation::BernoulliExponential(s)) => {
            check_sample(s)?;
            Ok(update_rate(BetaPosterior::from_prior(p)?, s)?.into())
        }
        (PriorSpec::Normal(p), Observation::SampleStats(s)) => Ok(update_normal(p, s)?.into()),
        (PriorSpec::Gamma(p), Observation::BernoulliExponential(s)) => {
            check_sample(s)?;
            Ok(update_exponential_rate(GammaPosterior::from_prior(p)?, s)?.into())
        }
        (prior, obs) => Err(CoreError::InconsistentObservation(format!(
            "a {} prior cannot absorb {} data",
            prior.family(),
            observation_kind(obs)
        ))),
    }
}

fn observation_kind(obs: &Observation) -> &'static str {
    match obs {
        Observation::Binomial(_) => "binomial",
        Observation::SampleStats(_) => "sample_stats",
        Observation::BernoulliExponential(_) => "bernoulli_exponential",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn beta_update_adds_counts() {
        let prior = BetaPosterior::new(1.0, 1.0).unwrap();
        let post = update_beta(
            prior,
            &BinomialObservation {
                successes: 254,
                trials: 1283,
            },
        )
        .unwrap();
        assert_eq!(post.alpha(), 255.0);
        assert_eq!(post.beta(), 1030.0);
    }

    #[test]
    fn beta_update_rejects_excess_successes() {
        let prior = BetaPosterior::new(1.0, 1.0).unwrap();
        let err = update_beta(
            prior,
            &BinomialObservation {
                successes: 5,
                trials: 4,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InconsistentObservation(_)));
    }

    #[test]
    fn constructors_fail_fast() {
        assert!(BetaPosterior::new(0.0, 1.0).is_err());
        assert!(NormalPosterior::new(1.0, -1.0).is_err());
        assert!(NormalPosterior::new(f64::NAN, 1.0).is_err());
        assert!(GammaPosterior::new(1.0, 0.0).is_err());
    }

    #[test]
    fn normal_update_matches_hand_computation() {
        let prior = NormalParams {
            mu: 0.0,
            sigma: 1.0,
            weight: 1.0,
        };
        let stats = SampleStats {
            mean: 52.3,
            sd: 14.1,
            n: 1283,
        };
        let post = update_normal(&prior, &stats).unwrap();
        let w_sample = 1283.0 / (14.1 * 14.1);
        let total = 1.0 + w_sample;
        assert!(approx_eq(post.mu(), 52.3 * w_sample / total, 1e-12));
        assert!(approx_eq(post.sigma(), total.sqrt().recip(), 1e-12));
    }

    #[test]
    fn fusion_of_single_estimate_is_that_estimate() {
        let post =
            update_normal_by_precision_fusion(&[NormalEstimate::new(3.0, 4.0, 1.0)]).unwrap();
        assert!(approx_eq(post.mu(), 3.0, 1e-15));
        assert!(approx_eq(post.sigma(), 2.0, 1e-15));
    }

    #[test]
    fn fusion_rejects_bad_estimates() {
        assert!(update_normal_by_precision_fusion(&[]).is_err());
        let err = update_normal_by_precision_fusion(&[NormalEstimate::new(1.0, 0.0, 1.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidParameter {
                name: "variance",
                ..
            }
        ));
    }

    #[test]
    fn compound_update_gates_magnitudes() {
        let sample = BernoulliExponentialSample {
            indicators: vec![1, 0, 1, 0],
            magnitudes: vec![10.0, 99.0, 30.0, 0.0],
        };
        let (rate, exp_rate) = update_gamma_beta(
            BetaPosterior::new(20.0, 80.0).unwrap(),
            GammaPosterior::new(5.0, 20.0).unwrap(),
            &sample,
        )
        .unwrap();
        assert_eq!(rate.alpha(), 22.0);
        assert_eq!(rate.beta(), 82.0);
        assert_eq!(exp_rate.shape(), 7.0);
        assert!(approx_eq(exp_rate.scale(), 1.0 / (0.05 + 40.0), 1e-15));
    }

    #[test]
    fn compound_update_rejects_length_mismatch() {
        let sample = BernoulliExponentialSample {
            indicators: vec![1, 0],
            magnitudes: vec![1.0],
        };
        let err = update_gamma_beta(
            BetaPosterior::new(1.0, 1.0).unwrap(),
            GammaPosterior::new(1.0, 1.0).unwrap(),
            &sample,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InconsistentObservation(_)));
    }

    #[test]
    fn tagged_update_dispatches_by_family() {
        let prior = PriorSpec::Beta(BetaParams {
            alpha: 2.0,
            beta: 3.0,
        });
        let obs = Observation::Binomial(BinomialObservation {
            successes: 1,
            trials: 4,
        });
        match update(&prior, &obs).unwrap() {
            PosteriorDistribution::Beta(p) => {
                assert_eq!((p.alpha(), p.beta()), (3.0, 6.0));
            }
            other => panic!("unexpected posterior {other:?}"),
        }

        let mismatched = PriorSpec::Gamma(GammaParams {
            shape: 1.0,
            scale: 1.0,
        });
        assert!(matches!(
            update(&mismatched, &obs),
            Err(CoreError::InconsistentObservation(_))
        ));
    }

    #[test]
    fn normal_log_moments_use_delta_approximation() {
        let p = NormalPosterior::new(50.0, 0.5).unwrap();
        assert!(approx_eq(p.log_mean(), 50.0f64.ln(), 1e-15));
        assert!(approx_eq(p.log_variance(), 1e-4, 1e-18));
    }

    #[test]
    fn posterior_serializes_with_family_tag() {
        let json = serde_json::to_value(PosteriorDistribution::from(
            GammaPosterior::new(5.0, 20.0).unwrap(),
        ))
        .unwrap();
        assert_eq!(json["family"], "gamma");
        assert_eq!(json["shape"], 5.0);
    }
}
