//! Polygamma functions of order 0 and 1.
//!
//! These give the exact moments of log X for X ~ Beta(α, β):
//! `E[log X] = ψ(α) - ψ(α+β)` and `Var[log X] = ψ₁(α) - ψ₁(α+β)`.
//!
//! Both functions shift the argument upward with the recurrences
//! `ψ(x) = ψ(x+1) - 1/x` and `ψ₁(x) = ψ₁(x+1) + 1/x²` until `x >= 10`, then
//! sum the asymptotic (Bernoulli-number) series. Non-positive arguments go
//! through the reflection formulas.

use std::f64::consts::PI;

/// Below this the asymptotic series is not accurate to double precision.
const ASYMPTOTIC_THRESHOLD: f64 = 10.0;

/// Digamma function ψ(x) = d/dx ln Γ(x).
///
/// Returns NaN at the poles (non-positive integers) and for NaN input.
pub fn digamma(x: f64) -> f64 {
    if x.is_nan() || x == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return f64::INFINITY;
    }
    if x <= 0.0 {
        if x == x.floor() {
            return f64::NAN;
        }
        // ψ(x) = ψ(1 - x) - π / tan(πx)
        return digamma(1.0 - x) - PI / (PI * x).tan();
    }

    let mut x = x;
    let mut acc = 0.0;
    while x < ASYMPTOTIC_THRESHOLD {
        acc -= 1.0 / x;
        x += 1.0;
    }

    let inv = 1.0 / x;
    let inv2 = inv * inv;
    // ln x - 1/(2x) - Σ B_{2k} / (2k x^{2k})
    let series = inv2
        * (1.0 / 12.0
            - inv2
                * (1.0 / 120.0
                    - inv2
                        * (1.0 / 252.0
                            - inv2 * (1.0 / 240.0 - inv2 * (1.0 / 132.0 - inv2 * 691.0 / 32_760.0)))));
    acc + x.ln() - 0.5 * inv - series
}

/// Trigamma function ψ₁(x) = d²/dx² ln Γ(x).
///
/// Returns NaN at the poles (non-positive integers) and for NaN input.
pub fn trigamma(x: f64) -> f64 {
    if x.is_nan() || x == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return 0.0;
    }
    if x <= 0.0 {
        if x == x.floor() {
            return f64::NAN;
        }
        // ψ₁(1 - x) + ψ₁(x) = π² / sin²(πx)
        let s = (PI * x).sin();
        return PI * PI / (s * s) - trigamma(1.0 - x);
    }

    let mut x = x;
    let mut acc = 0.0;
    while x < ASYMPTOTIC_THRESHOLD {
        acc += 1.0 / (x * x);
        x += 1.0;
    }

    let inv = 1.0 / x;
    let inv2 = inv * inv;
    // 1/x + 1/(2x²) + Σ B_{2k} / x^{2k+1}
    let series = inv
        * inv2
        * (1.0 / 6.0
            - inv2
                * (1.0 / 30.0
                    - inv2
                        * (1.0 / 42.0 - inv2 * (1.0 / 30.0 - inv2 * (5.0 / 66.0 - inv2 * 691.0 / 2730.0)))));
    acc + inv + 0.5 * inv2 + series
}
