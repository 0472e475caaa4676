//! Delta-method Normal approximations of `f(B) - f(A)`.
//!
//! For independent posteriors A and B and `f ∈ {identity, log}` the
//! difference is summarized by a Normal matching its first two moments:
//!
//! - identity: `E[B] - E[A]`, `Var[B] + Var[A]`
//! - log: `E[log B] - E[log A]`, `Var[log B] + Var[log A]`
//!
//! The log form approximates the log-ratio `log(B/A)`, so its quantiles
//! exponentiate into ratio quantiles.

use ab_math::{normal_cdf, normal_inv_cdf, normal_sf};
use serde::{Deserialize, Serialize};

use super::posterior::{LogMoments, Marginal};

/// Transform applied to each variant before differencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Identity,
    Log,
}

/// Closed interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Normal approximation of a transformed difference between variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedDistribution {
    pub transform: Transform,
    pub mean: f64,
    pub sd: f64,
}

impl DerivedDistribution {
    pub fn variance(&self) -> f64 {
        self.sd * self.sd
    }

    pub fn cdf(&self, x: f64) -> f64 {
        normal_cdf(x, self.mean, self.sd)
    }

    pub fn sf(&self, x: f64) -> f64 {
        normal_sf(x, self.mean, self.sd)
    }

    pub fn ppf(&self, p: f64) -> f64 {
        normal_inv_cdf(p, self.mean, self.sd)
    }

    /// P(f(B) - f(A) > 0).
    pub fn prob_positive(&self) -> f64 {
        self.sf(0.0)
    }

    /// Equal-tailed interval holding `level` of the mass.
    pub fn credible_interval(&self, level: f64) -> Interval {
        let tail = 0.5 * (1.0 - level);
        Interval {
            lower: self.ppf(tail),
            upper: self.ppf(1.0 - tail),
        }
    }

    /// Credible interval of the relative uplift `B/A - 1`, i.e. `exp(q) - 1`
    /// of the log-ratio quantiles.
    pub fn ratio_interval(&self, level: f64) -> Interval {
        let log_interval = self.credible_interval(level);
        Interval {
            lower: log_interval.lower.exp_m1(),
            upper: log_interval.upper.exp_m1(),
        }
    }

    /// P(B/A <= ratio) read off a log-ratio distribution.
    pub fn prob_ratio_below(&self, ratio: f64) -> f64 {
        self.cdf(ratio.ln())
    }
}

/// Delta-method approximation of `f(b) - f(a)`.
pub fn compose<D>(a: &D, b: &D, transform: Transform) -> DerivedDistribution
where
    D: Marginal + LogMoments,
{
    let (mean, variance) = match transform {
        Transform::Identity => (b.mean() - a.mean(), b.variance() + a.variance()),
        Transform::Log => (
            b.log_mean() - a.log_mean(),
            b.log_variance() + a.log_variance(),
        ),
    };
    DerivedDistribution {
        transform,
        mean,
        sd: variance.sqrt(),
    }
}
