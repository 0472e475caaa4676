//! Expected loss of choosing the wrong variant.
//!
//! With A and B independent,
//!
//! ```text
//! E[max(A, B)] = E[B·1{B>A}] + E[A·1{A≥B}]
//!              = ∫ b F_A(b) dP_B(b) + ∫ a F_B(a) dP_A(a)
//! ```
//!
//! Each term is a one-dimensional integral against a single marginal, so a
//! Gauss rule tied to that marginal evaluates it. The risk of committing to
//! A is then `E[max(A, B)] - E[A] = E[(B - A)⁺]`, and symmetrically for B.

use ab_math::QuadratureRule;
use serde::Serialize;
use tracing::debug;

use super::posterior::Marginal;
use crate::error::Result;

/// Expected loss from each choice, in the metric's native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskResult {
    /// E[(B - A)⁺]: loss from picking A when B is larger.
    pub risk_of_a: f64,
    /// E[(A - B)⁺]: loss from picking B when A is larger.
    pub risk_of_b: f64,
}

/// Risks from pre-built rules tied to `a` and `b` respectively.
///
/// Values are floored at zero. When the two spreads differ widely, the wide
/// rule cannot resolve the narrow variant's CDF step and the quadrature error
/// can push a near-zero risk below zero; the floor then absorbs that error and
/// `risk_of_a - risk_of_b` no longer equals `E[B] - E[A]` exactly.
pub fn risk_from_rules<D: Marginal>(
    a: &D,
    rule_a: &QuadratureRule,
    b: &D,
    rule_b: &QuadratureRule,
) -> RiskResult {
    let expected_max =
        rule_a.expectation(|x| x * b.cdf(x)) + rule_b.expectation(|x| x * a.cdf(x));
    RiskResult {
        risk_of_a: (expected_max - a.mean()).max(0.0),
        risk_of_b: (expected_max - b.mean()).max(0.0),
    }
}

/// Risks using `nodes`-point rules from the quadrature provider.
pub fn expected_loss<D: Marginal>(a: &D, b: &D, nodes: usize) -> Result<RiskResult> {
    let rule_a = a.quadrature(nodes)?;
    let rule_b = b.quadrature(nodes)?;
    let risk = risk_from_rules(a, &rule_a, b, &rule_b);
    debug!(
        nodes,
        risk_of_a = risk.risk_of_a,
        risk_of_b = risk.risk_of_b,
        "expected loss"
    );
    Ok(risk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::inference::posterior::{BetaPosterior, NormalPosterior};
    use ab_math::{std_normal_cdf, QuadratureError};
    use std::f64::consts::PI;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    /// E[(B-A)⁺] for B-A ~ N(m, s²) is m·Φ(m/s) + s·φ(m/s).
    fn normal_excess(m: f64, s: f64) -> f64 {
        let z = m / s;
        m * std_normal_cdf(z) + s * (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
    }

    #[test]
    fn normal_risk_matches_closed_form() {
        let a = NormalPosterior::new(45.0, 0.4).unwrap();
        let b = NormalPosterior::new(46.0, 0.3).unwrap();
        let risk = expected_loss(&a, &b, 24).unwrap();
        let s = (0.4f64 * 0.4 + 0.3 * 0.3).sqrt();
        assert!(approx_eq(risk.risk_of_a, normal_excess(1.0, s), 1e-5));
        assert!(approx_eq(risk.risk_of_b, normal_excess(-1.0, s), 1e-5));
    }

    #[test]
    fn identical_variants_share_risk() {
        let a = BetaPosterior::new(30.0, 70.0).unwrap();
        let risk = expected_loss(&a, &a, 24).unwrap();
        assert!(approx_eq(risk.risk_of_a, risk.risk_of_b, 1e-15));
        assert!(risk.risk_of_a > 0.0);
    }

    #[test]
    fn risk_difference_is_mean_difference() {
        let a = BetaPosterior::new(255.0, 1030.0).unwrap();
        let b = BetaPosterior::new(290.0, 1033.0).unwrap();
        let risk = expected_loss(&a, &b, 24).unwrap();
        assert!(approx_eq(
            risk.risk_of_a - risk.risk_of_b,
            b.mean() - a.mean(),
            1e-12
        ));
        assert!(risk.risk_of_a > risk.risk_of_b);
    }

    #[test]
    fn floor_absorbs_error_from_mismatched_spreads() {
        let a = NormalPosterior::new(26.0287, 0.05).unwrap();
        let b = NormalPosterior::new(40.2832, 3.3703).unwrap();
        let rule_a = a.quadrature(24).unwrap();
        let rule_b = b.quadrature(24).unwrap();
        let expected_max =
            rule_a.expectation(|x| x * b.cdf(x)) + rule_b.expectation(|x| x * a.cdf(x));
        // the narrow CDF step sits between wide Hermite nodes
        assert!(expected_max - b.mean() < -1e-4);

        let risk = risk_from_rules(&a, &rule_a, &b, &rule_b);
        assert_eq!(risk.risk_of_b, 0.0);
        let gap = b.mean() - a.mean();
        let s = (0.05f64 * 0.05 + 3.3703 * 3.3703).sqrt();
        assert!(risk.risk_of_a < gap);
        assert!(approx_eq(risk.risk_of_a, normal_excess(gap, s), 1e-3));
    }

    #[test]
    fn zero_nodes_propagates() {
        let a = NormalPosterior::new(0.0, 1.0).unwrap();
        let err = expected_loss(&a, &a, 0).unwrap_err();
        assert!(matches!(err, CoreError::Quadrature(QuadratureError::ZeroNodes)));
    }
}
