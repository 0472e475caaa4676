//! Numerical primitives for Bayesian A/B analysis.

pub mod math;

pub use math::beta::*;
pub use math::gamma::*;
pub use math::normal::*;
pub use math::quadrature::{
    hermite_normal, shifted_jacobi, QuadratureError, QuadratureRule, DEFAULT_NODES,
};
pub use math::special::{digamma, trigamma};
pub use math::stable::*;
