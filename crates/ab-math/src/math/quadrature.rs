//! Gauss quadrature rules tied to a specific Beta or Normal distribution.
//!
//! Rules are produced by the Golub–Welsch method: the monic three-term
//! recurrence of the orthogonal polynomial family defines a symmetric
//! tridiagonal (Jacobi) matrix whose eigenvalues are the nodes and whose
//! squared, normalized first eigenvector components are the weights.
//!
//! Because the weights come out already normalized, the weight function
//! `x^(α-1) (1-x)^(β-1)` is never evaluated. Its total mass `B(α, β)`
//! overflows for the shape parameters seen in large experiments, so it is
//! only ever reported in log form (`log_mass`). The recurrence
//! off-diagonals are products of four shape-sized factors and are also
//! assembled in the log domain.
//!
//! # Families
//!
//! | function         | distribution   | polynomials          | support |
//! |------------------|----------------|----------------------|---------|
//! | `shifted_jacobi` | Beta(α, β)     | shifted Jacobi       | [0, 1]  |
//! | `hermite_normal` | Normal(μ, σ)   | probabilist's Hermite| ℝ       |
//!
//! An n-point rule integrates polynomials of degree up to 2n-1 exactly
//! against the distribution.

use serde::Serialize;
use thiserror::Error;

use super::stable::{log_beta, LOG_SQRT_2PI};

/// Default number of quadrature nodes.
pub const DEFAULT_NODES: usize = 24;

/// Maximum QL sweeps per eigenvalue before giving up.
const QL_MAX_SWEEPS: usize = 60;

/// Allowed drift of the weight sum away from 1 before normalization.
const WEIGHT_SUM_TOL: f64 = 1e-8;

/// Round-off allowed for Jacobi nodes sitting on the edge of [0, 1].
const SUPPORT_SLACK: f64 = 1e-12;

/// Errors raised while generating a quadrature rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuadratureError {
    #[error("quadrature rule needs at least one node")]
    ZeroNodes,

    #[error("invalid {name} for quadrature: {value}")]
    InvalidShape { name: &'static str, value: f64 },

    #[error("{family} quadrature unstable: {reason}")]
    Unstable {
        family: &'static str,
        reason: String,
    },
}

/// Normalized nodes and weights for one distribution instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadratureRule {
    /// Nodes in ascending order.
    pub nodes: Vec<f64>,
    /// Non-negative weights summing to 1.
    pub weights: Vec<f64>,
    /// Log of the unnormalized weight-function mass.
    pub log_mass: f64,
}

impl QuadratureRule {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the rule has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Σ f(xᵢ)·wᵢ, the rule's estimate of E[f(X)].
    pub fn expectation<F>(&self, mut f: F) -> f64
    where
        F: FnMut(f64) -> f64,
    {
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| f(x) * w)
            .sum()
    }
}

/// Gauss rule for X ~ Beta(alpha, beta) on [0, 1].
///
/// Nodes are the roots of the degree-n shifted Jacobi polynomial orthogonal
/// under the Beta(alpha, beta) density.
pub fn shifted_jacobi(n: usize, alpha: f64, beta: f64) -> Result<QuadratureRule, QuadratureError> {
    if n == 0 {
        return Err(QuadratureError::ZeroNodes);
    }
    check_shape("alpha", alpha)?;
    check_shape("beta", beta)?;

    // Jacobi weight (1-t)^p (1+t)^q on [-1, 1]; x = (1+t)/2 maps it to the
    // Beta(alpha, beta) density on [0, 1].
    let p = beta - 1.0;
    let q = alpha - 1.0;
    let s = p + q;

    let mut diag = Vec::with_capacity(n);
    for k in 0..n {
        let a_k = if k == 0 {
            (q - p) / (s + 2.0)
        } else {
            let kf = k as f64;
            // (q² - p²) factored to avoid cancellation for large shapes
            (q - p) * (q + p) / ((2.0 * kf + s) * (2.0 * kf + s + 2.0))
        };
        diag.push(0.5 * (1.0 + a_k));
    }

    let mut off = Vec::with_capacity(n);
    for k in 1..n {
        let kf = k as f64;
        let log_b = if k == 1 {
            (4.0 * (1.0 + p) * (1.0 + q)).ln() - 2.0 * (2.0 + s).ln() - (3.0 + s).ln()
        } else {
            let t = 2.0 * kf + s;
            4.0f64.ln() + kf.ln() + (kf + p).ln() + (kf + q).ln() + (kf + s).ln()
                - 2.0 * t.ln()
                - (t + 1.0).ln()
                - (t - 1.0).ln()
        };
        // sqrt(b_k) / 2 after the affine map to [0, 1]
        off.push((0.5 * log_b - std::f64::consts::LN_2).exp());
    }

    let (mut nodes, weights) = golub_welsch("shifted_jacobi", diag, off)?;
    if nodes
        .iter()
        .any(|&x| x < -SUPPORT_SLACK || x > 1.0 + SUPPORT_SLACK)
    {
        return Err(unstable("shifted_jacobi", "node outside [0, 1]".to_string()));
    }
    for x in &mut nodes {
        *x = x.clamp(0.0, 1.0);
    }

    Ok(QuadratureRule {
        nodes,
        weights,
        log_mass: log_beta(alpha, beta),
    })
}

/// Probabilist's Gauss–Hermite rule for X ~ Normal(mu, sigma).
pub fn hermite_normal(n: usize, mu: f64, sigma: f64) -> Result<QuadratureRule, QuadratureError> {
    if n == 0 {
        return Err(QuadratureError::ZeroNodes);
    }
    if !mu.is_finite() {
        return Err(QuadratureError::InvalidShape { name: "mu", value: mu });
    }
    check_shape("sigma", sigma)?;

    let diag = vec![0.0; n];
    let off: Vec<f64> = (1..n).map(|k| (k as f64).sqrt()).collect();
    let (std_nodes, weights) = golub_welsch("hermite", diag, off)?;

    Ok(QuadratureRule {
        nodes: std_nodes.into_iter().map(|z| mu + sigma * z).collect(),
        weights,
        log_mass: LOG_SQRT_2PI,
    })
}

fn check_shape(name: &'static str, value: f64) -> Result<(), QuadratureError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(QuadratureError::InvalidShape { name, value })
    }
}

fn unstable(family: &'static str, reason: String) -> QuadratureError {
    QuadratureError::Unstable { family, reason }
}

/// Eigen-decompose the Jacobi matrix and return (nodes, normalized weights)
/// sorted by node.
fn golub_welsch(
    family: &'static str,
    mut diag: Vec<f64>,
    off: Vec<f64>,
) -> Result<(Vec<f64>, Vec<f64>), QuadratureError> {
    let n = diag.len();
    if off.iter().any(|v| !v.is_finite()) || diag.iter().any(|v| !v.is_finite()) {
        return Err(unstable(family, "non-finite recurrence coefficient".to_string()));
    }

    // e[i] couples rows i and i+1; e[n-1] is scratch.
    let mut e = off;
    e.push(0.0);
    // First row of the accumulated eigenvector matrix.
    let mut first = vec![0.0; n];
    first[0] = 1.0;

    tql_first_row(&mut diag, &mut e, &mut first)
        .map_err(|sweeps| unstable(family, format!("QL iteration did not converge after {sweeps} sweeps")))?;

    let mut pairs: Vec<(f64, f64)> = diag
        .into_iter()
        .zip(first)
        .map(|(x, v)| (x, v * v))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total: f64 = pairs.iter().map(|(_, w)| w).sum();
    if !total.is_finite() || (total - 1.0).abs() > WEIGHT_SUM_TOL {
        return Err(unstable(family, format!("weights sum to {total}")));
    }
    if pairs.iter().any(|(x, w)| !x.is_finite() || !w.is_finite() || *w < 0.0) {
        return Err(unstable(family, "non-finite node or weight".to_string()));
    }

    Ok(pairs.into_iter().map(|(x, w)| (x, w / total)).unzip())
}

/// Implicit-shift QL on a symmetric tridiagonal matrix (tqli), rotating only
/// the first row of the eigenvector matrix. On success `d` holds the
/// eigenvalues and `z` the first component of each eigenvector.
fn tql_first_row(d: &mut [f64], e: &mut [f64], z: &mut [f64]) -> Result<(), usize> {
    let n = d.len();
    for l in 0..n {
        let mut sweeps = 0;
        loop {
            let mut m = l;
            while m + 1 < n {
                let dd = d[m].abs() + d[m + 1].abs();
                if e[m].abs() <= f64::EPSILON * dd {
                    break;
                }
                m += 1;
            }
            if m == l {
                break;
            }
            sweeps += 1;
            if sweeps > QL_MAX_SWEEPS {
                return Err(QL_MAX_SWEEPS);
            }

            let mut g = (d[l + 1] - d[l]) / (2.0 * e[l]);
            let mut r = g.hypot(1.0);
            let signed_r = if g >= 0.0 { r } else { -r };
            g = d[m] - d[l] + e[l] / (g + signed_r);
            let (mut s, mut c, mut p) = (1.0, 1.0, 0.0);
            let mut deflated = false;

            let mut i = m;
            while i > l {
                i -= 1;
                let f = s * e[i];
                let b = c * e[i];
                r = f.hypot(g);
                e[i + 1] = r;
                if r == 0.0 {
                    d[i + 1] -= p;
                    e[m] = 0.0;
                    deflated = true;
                    break;
                }
                s = f / r;
                c = g / r;
                g = d[i + 1] - p;
                r = (d[i] - g) * s + 2.0 * c * b;
                p = s * r;
                d[i + 1] = g + p;
                g = c * r - b;

                let zf = z[i + 1];
                z[i + 1] = s * z[i] + c * zf;
                z[i] = c * z[i] - s * zf;
            }
            if deflated {
                continue;
            }
            d[l] -= p;
            e[l] = g;
            e[m] = 0.0;
        }
    }
    Ok(())
}
