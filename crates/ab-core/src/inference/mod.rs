//! Inference engine: posterior updates, delta-method summaries, expected
//! loss and the compound moment-matcher.

pub mod compound;
pub mod delta;
pub mod posterior;
pub mod risk;

pub use compound::{CompoundPosterior, CompoundPrior, ProductMoments};
pub use delta::{compose, DerivedDistribution, Interval, Transform};
pub use posterior::{
    update, update_beta, update_gamma_beta, update_normal, update_normal_by_precision_fusion,
    BetaPosterior, GammaPosterior, LogMoments, Marginal, NormalEstimate, NormalPosterior,
    PosteriorDistribution,
};
pub use risk::{expected_loss, risk_from_rules, RiskResult};
