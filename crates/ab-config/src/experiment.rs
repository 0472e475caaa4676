//! Experiment configuration types.
//!
//! An experiment file carries the priors and observed data for both variants
//! of every metric, plus the numerical settings used by the analysis.

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Complete experiment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub schema_version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    pub conversion: ConversionSection,

    pub revenue: RevenueSection,

    #[serde(default)]
    pub compound: Option<CompoundSection>,

    #[serde(default)]
    pub quadrature: QuadratureSettings,

    #[serde(default)]
    pub report: ReportSettings,
}

/// Beta-Binomial conversion metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSection {
    pub prior: BetaParams,
    pub a: BinomialObservation,
    pub b: BinomialObservation,
}

/// Normal-Normal per-user value metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSection {
    pub prior: NormalParams,
    pub a: SampleStats,
    pub b: SampleStats,
}

/// Bernoulli × Exponential compound metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundSection {
    /// Prior on the event rate.
    pub rate_prior: BetaParams,
    /// Prior on the Exponential mean of the magnitude.
    pub magnitude_prior: GammaParams,
    pub a: BernoulliExponentialSample,
    pub b: BernoulliExponentialSample,
}

/// Beta distribution parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaParams {
    pub alpha: f64,
    pub beta: f64,
}

/// Normal prior on a mean, worth `weight` pseudo-observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    pub mu: f64,
    pub sigma: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Gamma distribution parameters (shape, scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaParams {
    pub shape: f64,
    pub scale: f64,
}

/// Prior specification tagged by distribution family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum PriorSpec {
    Beta(BetaParams),
    Normal(NormalParams),
    Gamma(GammaParams),
}

impl PriorSpec {
    /// Family name as it appears in the `family` tag.
    pub fn family(&self) -> &'static str {
        match self {
            PriorSpec::Beta(_) => "beta",
            PriorSpec::Normal(_) => "normal",
            PriorSpec::Gamma(_) => "gamma",
        }
    }
}

/// Conversion counts for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinomialObservation {
    pub successes: u64,
    pub trials: u64,
}

/// Summary statistics of a per-user metric for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub mean: f64,
    pub sd: f64,
    pub n: u64,
}

/// Raw per-user draws: did the event happen, and how large was it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BernoulliExponentialSample {
    pub indicators: Vec<u8>,
    pub magnitudes: Vec<f64>,
}

impl BernoulliExponentialSample {
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Number of rows with the event indicator set.
    pub fn events(&self) -> u64 {
        self.indicators.iter().filter(|&&i| i == 1).count() as u64
    }

    /// Per-user value `indicator * magnitude`.
    pub fn values(&self) -> impl Iterator<Item = f64> + Clone + '_ {
        self.indicators
            .iter()
            .zip(&self.magnitudes)
            .map(|(&i, &m)| f64::from(i) * m)
    }
}

/// Observed data tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    Binomial(BinomialObservation),
    SampleStats(SampleStats),
    BernoulliExponential(BernoulliExponentialSample),
}

/// Quadrature settings for the risk estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadratureSettings {
    #[serde(default = "default_nodes")]
    pub nodes: usize,
}

fn default_nodes() -> usize {
    24
}

impl Default for QuadratureSettings {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
        }
    }
}

/// Decision thresholds reported alongside the posteriors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Mass of the central credible intervals.
    #[serde(default = "default_credible_level")]
    pub credible_level: f64,

    /// Ratio B/A below which B counts as a regression.
    #[serde(default = "default_downside_ratio")]
    pub downside_ratio: f64,
}

fn default_credible_level() -> f64 {
    0.95
}

fn default_downside_ratio() -> f64 {
    0.98
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            credible_level: default_credible_level(),
            downside_ratio: default_downside_ratio(),
        }
    }
}

impl Default for ExperimentConfig {
    /// The reference experiment: a 1283 vs 1321 user split with a flat
    /// conversion prior and a weak revenue prior.
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            name: Some("reference".to_string()),
            description: Some("Two-variant checkout test".to_string()),
            conversion: ConversionSection {
                prior: BetaParams {
                    alpha: 1.0,
                    beta: 1.0,
                },
                a: BinomialObservation {
                    successes: 254,
                    trials: 1283,
                },
                b: BinomialObservation {
                    successes: 289,
                    trials: 1321,
                },
            },
            revenue: RevenueSection {
                prior: NormalParams {
                    mu: 0.0,
                    sigma: 1.0,
                    weight: 1.0,
                },
                a: SampleStats {
                    mean: 52.3,
                    sd: 14.1,
                    n: 1283,
                },
                b: SampleStats {
                    mean: 52.8,
                    sd: 13.7,
                    n: 1321,
                },
            },
            compound: None,
            quadrature: QuadratureSettings::default(),
            report: ReportSettings::default(),
        }
    }
}

impl ExperimentConfig {
    /// Load an experiment from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_str(&content)
    }

    /// Parse an experiment from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }
}
