//! Monte Carlo cross-check of the analytic approximations.
//!
//! Draws large seeded samples from the same posterior families the analysis
//! used and recomputes every decision metric empirically. Nothing here feeds
//! back into the analysis; it only reports how far each closed-form or
//! quadrature value sits from its simulated counterpart.

use rand::distr::{Bernoulli, Distribution};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Exp, Gamma, Normal};
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::AnalysisReport;
use crate::error::{CoreError, Result};
use crate::inference::{
    BetaPosterior, CompoundPosterior, CompoundPrior, GammaPosterior, NormalPosterior,
};
use crate::logging::generate_run_id;

/// Default number of draws per distribution.
pub const DEFAULT_DRAWS: usize = 500_000;

/// Default number of synthetic users in the compound check.
pub const DEFAULT_SAMPLE_SIZE: usize = 2_000;

/// Default relative tolerance before a check counts as divergent.
pub const DEFAULT_REL_TOLERANCE: f64 = 0.05;

/// Default absolute tolerance before a check counts as divergent.
pub const DEFAULT_ABS_TOLERANCE: f64 = 5e-3;

/// Quantiles compared between the compound product and its Normal fit.
pub const COMPOUND_QUANTILES: [f64; 5] = [0.1, 0.2, 0.5, 0.8, 0.9];

/// Draw from a posterior with an explicit seed.
pub trait Sampler {
    fn sample(&self, draws: usize, seed: u64) -> Result<Vec<f64>>;
}

/// First parameter a sampler would reject, for error reporting.
fn rejected(params: &[(&'static str, f64)]) -> CoreError {
    let (name, value) = params
        .iter()
        .copied()
        .find(|(_, v)| !v.is_finite() || *v <= 0.0)
        .or_else(|| params.last().copied())
        .unwrap_or(("parameter", f64::NAN));
    CoreError::InvalidParameter { name, value }
}

fn draw<D: Distribution<f64>>(dist: D, draws: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    dist.sample_iter(&mut rng).take(draws).collect()
}

impl Sampler for BetaPosterior {
    fn sample(&self, draws: usize, seed: u64) -> Result<Vec<f64>> {
        let dist = Beta::new(self.alpha(), self.beta())
            .map_err(|_| rejected(&[("alpha", self.alpha()), ("beta", self.beta())]))?;
        Ok(draw(dist, draws, seed))
    }
}

impl Sampler for NormalPosterior {
    fn sample(&self, draws: usize, seed: u64) -> Result<Vec<f64>> {
        // mu may be any finite value, so only sigma is positivity-checked
        let dist = Normal::new(self.mu(), self.sigma()).map_err(|_| {
            if self.mu().is_finite() {
                rejected(&[("sigma", self.sigma())])
            } else {
                CoreError::InvalidParameter {
                    name: "mu",
                    value: self.mu(),
                }
            }
        })?;
        Ok(draw(dist, draws, seed))
    }
}

impl Sampler for GammaPosterior {
    fn sample(&self, draws: usize, seed: u64) -> Result<Vec<f64>> {
        let dist = Gamma::new(self.shape(), self.scale())
            .map_err(|_| rejected(&[("shape", self.shape()), ("scale", self.scale())]))?;
        Ok(draw(dist, draws, seed))
    }
}

/// Mean of a sample.
pub fn sample_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population (ddof 0) standard deviation.
pub fn sample_std(values: &[f64]) -> f64 {
    let mean = sample_mean(values);
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Empirical quantiles with linear interpolation between order statistics.
pub fn empirical_quantiles(values: &[f64], probs: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![f64::NAN; probs.len()];
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let last = sorted.len() - 1;
    probs
        .iter()
        .map(|&p| {
            let h = p.clamp(0.0, 1.0) * last as f64;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(last);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        })
        .collect()
}

/// Fraction of values satisfying `pred`.
fn fraction<F: Fn(f64) -> bool>(values: impl Iterator<Item = f64>, n: usize, pred: F) -> f64 {
    values.filter(|&v| pred(v)).count() as f64 / n as f64
}

/// One analytic-versus-simulated check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub check: String,
    pub analytic: Vec<f64>,
    pub simulated: Vec<f64>,
    pub abs_diff: Vec<f64>,
    /// `|analytic / simulated - 1|`.
    pub rel_diff: Vec<f64>,
}

impl Comparison {
    pub fn new(check: impl Into<String>, analytic: Vec<f64>, simulated: Vec<f64>) -> Self {
        let abs_diff = analytic
            .iter()
            .zip(&simulated)
            .map(|(a, s)| (a - s).abs())
            .collect();
        let rel_diff = analytic
            .iter()
            .zip(&simulated)
            .map(|(a, s)| (a / s - 1.0).abs())
            .collect();
        Self {
            check: check.into(),
            analytic,
            simulated,
            abs_diff,
            rel_diff,
        }
    }

    pub fn scalar(check: impl Into<String>, analytic: f64, simulated: f64) -> Self {
        Self::new(check, vec![analytic], vec![simulated])
    }

    pub fn max_abs_diff(&self) -> f64 {
        self.abs_diff.iter().copied().fold(0.0, f64::max)
    }

    pub fn max_rel_diff(&self) -> f64 {
        self.rel_diff.iter().copied().fold(0.0, f64::max)
    }

    pub fn diverges(&self, rel_tolerance: f64, abs_tolerance: f64) -> bool {
        self.abs_diff
            .iter()
            .zip(&self.rel_diff)
            .any(|(&abs, &rel)| abs > abs_tolerance && rel > rel_tolerance)
    }
}

/// Seeds for the four posterior samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PosteriorSeeds {
    pub conversion_a: u64,
    pub conversion_b: u64,
    pub revenue_a: u64,
    pub revenue_b: u64,
}

impl Default for PosteriorSeeds {
    fn default() -> Self {
        Self {
            conversion_a: 1235,
            conversion_b: 3418,
            revenue_a: 8731,
            revenue_b: 6754,
        }
    }
}

/// Harness settings for an analysis cross-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HarnessSettings {
    pub draws: usize,
    pub seeds: PosteriorSeeds,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            draws: DEFAULT_DRAWS,
            seeds: PosteriorSeeds::default(),
        }
    }
}

/// Result of cross-checking one analysis report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub run_id: String,
    pub analysis_run_id: String,
    pub settings: HarnessSettings,
    pub checks: Vec<Comparison>,
}

impl ValidationReport {
    /// Checks with any component off by more than both tolerances.
    ///
    /// Tail probabilities near zero carry large relative noise, so a
    /// component only diverges when the absolute gap is also material.
    pub fn diverging(&self, rel_tolerance: f64, abs_tolerance: f64) -> Vec<&Comparison> {
        self.checks
            .iter()
            .filter(|c| c.diverges(rel_tolerance, abs_tolerance))
            .collect()
    }

    pub fn check(&self, name: &str) -> Option<&Comparison> {
        self.checks.iter().find(|c| c.check == name)
    }
}

/// Simulate both metrics of `report` and compare against its analytic values.
pub fn validate_analysis(
    report: &AnalysisReport,
    settings: &HarnessSettings,
) -> Result<ValidationReport> {
    if settings.draws == 0 {
        return Err(CoreError::InvalidParameter {
            name: "draws",
            value: 0.0,
        });
    }
    let n = settings.draws;
    let seeds = settings.seeds;
    let tail = 0.5 * (1.0 - report.credible_level);
    let bounds = [tail, 1.0 - tail];

    let rate_a = report.conversion.posterior_a.sample(n, seeds.conversion_a)?;
    let rate_b = report.conversion.posterior_b.sample(n, seeds.conversion_b)?;
    let mean_a = report.revenue.posterior_a.sample(n, seeds.revenue_a)?;
    let mean_b = report.revenue.posterior_b.sample(n, seeds.revenue_b)?;
    debug!(draws = n, "posterior samples drawn");

    let rate_diff: Vec<f64> = rate_b.iter().zip(&rate_a).map(|(b, a)| b - a).collect();
    let rate_uplift: Vec<f64> = rate_b.iter().zip(&rate_a).map(|(b, a)| b / a - 1.0).collect();
    let mean_diff: Vec<f64> = mean_b.iter().zip(&mean_a).map(|(b, a)| b - a).collect();
    let mean_ratio = mean_b.iter().zip(&mean_a).map(|(b, a)| b / a);

    let conversion = &report.conversion;
    let revenue = &report.revenue;
    let downside = revenue.downside_ratio;
    let level = report.credible_level;

    let checks = vec![
        Comparison::scalar(
            "conversion.prob_b_better",
            conversion.prob_b_better,
            fraction(rate_diff.iter().copied(), n, |d| d > 0.0),
        ),
        Comparison::new(
            format!("conversion.uplift_interval@{}", level),
            vec![conversion.uplift_interval.lower, conversion.uplift_interval.upper],
            empirical_quantiles(&rate_uplift, &bounds),
        ),
        Comparison::scalar(
            format!("revenue.prob_ratio_below@{}", downside),
            revenue.prob_below_downside,
            fraction(mean_ratio, n, |r| r <= downside),
        ),
        Comparison::new(
            format!("revenue.difference_interval@{}", level),
            vec![revenue.difference_interval.lower, revenue.difference_interval.upper],
            empirical_quantiles(&mean_diff, &bounds),
        ),
        Comparison::scalar(
            "conversion.risk_of_a",
            conversion.risk.risk_of_a,
            sample_mean(&positive_part(&rate_diff, 1.0)),
        ),
        Comparison::scalar(
            "conversion.risk_of_b",
            conversion.risk.risk_of_b,
            sample_mean(&positive_part(&rate_diff, -1.0)),
        ),
        Comparison::scalar(
            "revenue.risk_of_a",
            revenue.risk.risk_of_a,
            sample_mean(&positive_part(&mean_diff, 1.0)),
        ),
        Comparison::scalar(
            "revenue.risk_of_b",
            revenue.risk.risk_of_b,
            sample_mean(&positive_part(&mean_diff, -1.0)),
        ),
    ];

    let result = ValidationReport {
        run_id: generate_run_id(),
        analysis_run_id: report.run_id.clone(),
        settings: *settings,
        checks,
    };
    info!(
        run_id = %result.run_id,
        checks = result.checks.len(),
        worst_rel_diff = result
            .checks
            .iter()
            .map(Comparison::max_rel_diff)
            .fold(0.0, f64::max),
        "validation complete"
    );
    Ok(result)
}

/// `max(sign·d, 0)` per element.
fn positive_part(diffs: &[f64], sign: f64) -> Vec<f64> {
    diffs.iter().map(|d| (sign * d).max(0.0)).collect()
}

/// Seeds for the compound check, one per random stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompoundSeeds {
    /// True event rate drawn from the rate prior.
    pub rate: u64,
    /// True mean magnitude drawn from the magnitude prior.
    pub magnitude: u64,
    /// Synthetic per-user indicators and magnitudes.
    pub data: u64,
    pub posterior_rate: u64,
    pub posterior_exponential: u64,
    pub normal: u64,
}

impl Default for CompoundSeeds {
    fn default() -> Self {
        Self {
            rate: 3514,
            magnitude: 4348,
            data: 2718,
            posterior_rate: 1535,
            posterior_exponential: 9753,
            normal: 5384,
        }
    }
}

/// Settings for the compound Normal-approximation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompoundCheckSettings {
    pub sample_size: usize,
    pub draws: usize,
    pub seeds: CompoundSeeds,
}

impl Default for CompoundCheckSettings {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            draws: DEFAULT_DRAWS,
            seeds: CompoundSeeds::default(),
        }
    }
}

/// Outcome of the compound check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundCheck {
    pub run_id: String,
    pub settings: CompoundCheckSettings,
    pub true_rate: f64,
    pub true_mean_magnitude: f64,
    pub events: u64,
    pub posterior: CompoundPosterior,
    /// Fused Normal (analytic) against the Beta/Gamma product (simulated).
    pub checks: Vec<Comparison>,
}

/// Simulate a synthetic experiment from `prior`, fit it, and compare the
/// fused Normal against the Beta/Gamma product posterior.
pub fn compound_check(prior: &CompoundPrior, settings: &CompoundCheckSettings) -> Result<CompoundCheck> {
    if settings.draws == 0 || settings.sample_size == 0 {
        return Err(CoreError::InvalidParameter {
            name: "draws",
            value: settings.draws.min(settings.sample_size) as f64,
        });
    }
    let seeds = settings.seeds;

    let true_rate = prior.rate.sample(1, seeds.rate)?[0];
    let true_mean_magnitude = prior.magnitude.sample(1, seeds.magnitude)?[0];
    let sample = synthetic_sample(true_rate, true_mean_magnitude, settings.sample_size, seeds.data)?;
    let posterior = prior.fit(&sample)?;

    let rate_draws = posterior.rate.sample(settings.draws, seeds.posterior_rate)?;
    let exp_draws = posterior
        .exponential_rate
        .sample(settings.draws, seeds.posterior_exponential)?;
    let product: Vec<f64> = rate_draws.iter().zip(&exp_draws).map(|(r, g)| r / g).collect();
    let normal = posterior.fused.sample(settings.draws, seeds.normal)?;

    let checks = vec![
        Comparison::scalar("mean", sample_mean(&normal), sample_mean(&product)),
        Comparison::scalar("std", sample_std(&normal), sample_std(&product)),
        Comparison::new(
            "quantiles",
            empirical_quantiles(&normal, &COMPOUND_QUANTILES),
            empirical_quantiles(&product, &COMPOUND_QUANTILES),
        ),
    ];

    let result = CompoundCheck {
        run_id: generate_run_id(),
        settings: *settings,
        true_rate,
        true_mean_magnitude,
        events: sample.events(),
        posterior,
        checks,
    };
    info!(
        run_id = %result.run_id,
        true_rate,
        true_mean_magnitude,
        events = result.events,
        "compound check complete"
    );
    Ok(result)
}

/// Users convert with probability `rate`; every user gets an Exponential
/// magnitude with mean `mean_magnitude`, gated by the indicator downstream.
fn synthetic_sample(
    rate: f64,
    mean_magnitude: f64,
    size: usize,
    seed: u64,
) -> Result<ab_config::BernoulliExponentialSample> {
    let bernoulli = Bernoulli::new(rate).map_err(|_| CoreError::InvalidParameter {
        name: "rate",
        value: rate,
    })?;
    let exp = Exp::new(mean_magnitude.recip()).map_err(|_| CoreError::InvalidParameter {
        name: "mean_magnitude",
        value: mean_magnitude,
    })?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indicators = Vec::with_capacity(size);
    let mut magnitudes = Vec::with_capacity(size);
    for _ in 0..size {
        indicators.push(u8::from(bernoulli.sample(&mut rng)));
        magnitudes.push(exp.sample(&mut rng));
    }
    Ok(ab_config::BernoulliExponentialSample {
        indicators,
        magnitudes,
    })
}
