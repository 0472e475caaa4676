//! Full two-variant analysis of an experiment configuration.
//!
//! Every derived quantity is threaded through `AnalysisReport`; nothing is
//! cached between runs.

use ab_config::{validate_experiment, ExperimentConfig, ReportSettings};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::inference::{
    compose, expected_loss, update_beta, update_normal, BetaPosterior, CompoundPosterior,
    CompoundPrior, DerivedDistribution, Interval, LogMoments, Marginal, NormalPosterior,
    RiskResult, Transform,
};
use crate::logging::generate_run_id;

/// Per-run overrides of the experiment's numerical settings.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Quadrature node count; falls back to the experiment's setting.
    pub nodes: Option<usize>,
    /// Credible level; falls back to the experiment's setting.
    pub credible_level: Option<f64>,
}

impl AnalysisOptions {
    /// Copy of `config` with the overrides applied, ready for validation.
    pub fn apply(&self, config: &ExperimentConfig) -> ExperimentConfig {
        let mut resolved = config.clone();
        if let Some(nodes) = self.nodes {
            resolved.quadrature.nodes = nodes;
        }
        if let Some(level) = self.credible_level {
            resolved.report.credible_level = level;
        }
        resolved
    }
}

/// Decision metrics for one metric (conversion or revenue).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport<P> {
    pub posterior_a: P,
    pub posterior_b: P,
    /// Normal approximation of B - A.
    pub difference: DerivedDistribution,
    /// Normal approximation of log(B/A).
    pub log_ratio: DerivedDistribution,
    /// P(B - A > 0).
    pub prob_b_better: f64,
    pub downside_ratio: f64,
    /// P(B/A <= downside_ratio).
    pub prob_below_downside: f64,
    pub difference_interval: Interval,
    /// Interval of B/A - 1.
    pub uplift_interval: Interval,
    pub risk: RiskResult,
}

/// Compound-model metrics for both variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundReport {
    pub prior: CompoundPrior,
    pub a: CompoundPosterior,
    pub b: CompoundPosterior,
    /// B - A of the fused per-user value.
    pub difference: DerivedDistribution,
    pub prob_b_better: f64,
    pub difference_interval: Interval,
    pub risk: RiskResult,
}

/// Result bundle of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub schema_version: String,
    pub experiment: Option<String>,
    pub nodes: usize,
    pub credible_level: f64,
    pub conversion: MetricReport<BetaPosterior>,
    pub revenue: MetricReport<NormalPosterior>,
    pub compound: Option<CompoundReport>,
}

/// Analyze an experiment end to end.
pub fn analyze(config: &ExperimentConfig, options: &AnalysisOptions) -> Result<AnalysisReport> {
    let resolved = options.apply(config);
    validate_experiment(&resolved)?;
    let config = &resolved;

    let nodes = config.quadrature.nodes;
    let settings = config.report;
    let run_id = generate_run_id();
    info!(run_id = %run_id, nodes, experiment = ?config.name, "analysis started");

    let conversion_prior = BetaPosterior::from_prior(&config.conversion.prior)?;
    let conversion = metric_report(
        update_beta(conversion_prior, &config.conversion.a)?,
        update_beta(conversion_prior, &config.conversion.b)?,
        nodes,
        &settings,
    )?;

    let revenue_a = update_normal(&config.revenue.prior, &config.revenue.a)?;
    let revenue_b = update_normal(&config.revenue.prior, &config.revenue.b)?;
    require_positive_mean("revenue.a", &revenue_a)?;
    require_positive_mean("revenue.b", &revenue_b)?;
    let revenue = metric_report(revenue_a, revenue_b, nodes, &settings)?;

    let compound = match config.compound {
        Some(ref section) => {
            let prior = CompoundPrior::from_config(section)?;
            let a = prior.fit(&section.a)?;
            let b = prior.fit(&section.b)?;
            let difference = compose(&a.fused, &b.fused, Transform::Identity);
            Some(CompoundReport {
                prior,
                a,
                b,
                difference,
                prob_b_better: difference.prob_positive(),
                difference_interval: difference.credible_interval(settings.credible_level),
                risk: expected_loss(&a.fused, &b.fused, nodes)?,
            })
        }
        None => None,
    };

    info!(
        run_id = %run_id,
        conversion_prob_b_better = conversion.prob_b_better,
        revenue_prob_b_better = revenue.prob_b_better,
        "analysis complete"
    );

    Ok(AnalysisReport {
        run_id,
        generated_at: Utc::now(),
        schema_version: config.schema_version.clone(),
        experiment: config.name.clone(),
        nodes,
        credible_level: settings.credible_level,
        conversion,
        revenue,
        compound,
    })
}

fn metric_report<P>(a: P, b: P, nodes: usize, settings: &ReportSettings) -> Result<MetricReport<P>>
where
    P: Marginal + LogMoments,
{
    let difference = compose(&a, &b, Transform::Identity);
    let log_ratio = compose(&a, &b, Transform::Log);
    let risk = expected_loss(&a, &b, nodes)?;
    debug!(
        difference_mean = difference.mean,
        difference_sd = difference.sd,
        log_ratio_mean = log_ratio.mean,
        log_ratio_sd = log_ratio.sd,
        "metric composed"
    );

    Ok(MetricReport {
        prob_b_better: difference.prob_positive(),
        downside_ratio: settings.downside_ratio,
        prob_below_downside: log_ratio.prob_ratio_below(settings.downside_ratio),
        difference_interval: difference.credible_interval(settings.credible_level),
        uplift_interval: log_ratio.ratio_interval(settings.credible_level),
        posterior_a: a,
        posterior_b: b,
        difference,
        log_ratio,
        risk,
    })
}

/// The log-ratio of Normal means only exists for positive means.
fn require_positive_mean(name: &'static str, posterior: &NormalPosterior) -> Result<()> {
    if posterior.mu() > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidParameter {
            name,
            value: posterior.mu(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_config::{
        BernoulliExponentialSample, BetaParams, CompoundSection, GammaParams, ValidationError,
    };

    #[test]
    fn reference_experiment_runs() {
        let report = analyze(&ExperimentConfig::default(), &AnalysisOptions::default()).unwrap();
        assert_eq!(report.nodes, 24);
        assert!(report.run_id.starts_with("run-"));
        assert_eq!(report.conversion.posterior_a.alpha(), 255.0);
        assert_eq!(report.conversion.posterior_b.beta(), 1033.0);
        assert!(report.revenue.posterior_b.mu() > report.revenue.posterior_a.mu());
        assert!(report.compound.is_none());
    }

    #[test]
    fn options_override_config() {
        let options = AnalysisOptions {
            nodes: Some(8),
            credible_level: Some(0.9),
        };
        let report = analyze(&ExperimentConfig::default(), &options).unwrap();
        assert_eq!(report.nodes, 8);
        assert_eq!(report.credible_level, 0.9);
        let wide = analyze(&ExperimentConfig::default(), &AnalysisOptions::default()).unwrap();
        assert!(
            report.revenue.difference_interval.width() < wide.revenue.difference_interval.width()
        );
    }

    #[test]
    fn non_positive_revenue_mean_is_rejected() {
        let mut config = ExperimentConfig::default();
        config.revenue.a.mean = -5.0;
        let err = analyze(&config, &AnalysisOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidParameter {
                name: "revenue.a",
                ..
            }
        ));
    }

    #[test]
    fn overrides_are_validated() {
        let level = AnalysisOptions {
            credible_level: Some(1.5),
            ..AnalysisOptions::default()
        };
        let err = analyze(&ExperimentConfig::default(), &level).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ValidationError::InvalidValue { ref field, .. })
                if field == "report.credible_level"
        ));

        for nodes in [0, 5_000] {
            let options = AnalysisOptions {
                nodes: Some(nodes),
                ..AnalysisOptions::default()
            };
            let err = analyze(&ExperimentConfig::default(), &options).unwrap_err();
            assert!(matches!(err, CoreError::Config(_)), "nodes = {nodes}");
        }
    }

    #[test]
    fn apply_leaves_source_untouched() {
        let config = ExperimentConfig::default();
        let options = AnalysisOptions {
            nodes: Some(12),
            credible_level: Some(0.8),
        };
        let resolved = options.apply(&config);
        assert_eq!(resolved.quadrature.nodes, 12);
        assert_eq!(resolved.report.credible_level, 0.8);
        assert_eq!(config.quadrature.nodes, 24);
    }

    #[test]
    fn invalid_config_surfaces_as_config_error() {
        let mut config = ExperimentConfig::default();
        config.conversion.a.successes = 5_000;
        let err = analyze(&config, &AnalysisOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn compound_section_is_reported() {
        let config = ExperimentConfig {
            compound: Some(CompoundSection {
                rate_prior: BetaParams {
                    alpha: 20.0,
                    beta: 80.0,
                },
                magnitude_prior: GammaParams {
                    shape: 5.0,
                    scale: 20.0,
                },
                a: BernoulliExponentialSample {
                    indicators: vec![1, 0, 0, 1, 0],
                    magnitudes: vec![50.0, 0.0, 0.0, 70.0, 0.0],
                },
                b: BernoulliExponentialSample {
                    indicators: vec![1, 1, 0, 1, 0],
                    magnitudes: vec![40.0, 90.0, 0.0, 65.0, 0.0],
                },
            }),
            ..ExperimentConfig::default()
        };
        let report = analyze(&config, &AnalysisOptions::default()).unwrap();
        let compound = report.compound.expect("compound section");
        assert!(compound.a.fused.mu() > 0.0);
        assert!(compound.risk.risk_of_a >= 0.0);
        assert!(compound.risk.risk_of_b >= 0.0);
        let json = serde_json::to_value(&compound).unwrap();
        assert!(json["a"]["fused"]["sigma"].as_f64().unwrap() > 0.0);
    }
}
