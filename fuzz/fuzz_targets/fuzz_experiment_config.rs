//! Fuzz target for experiment.json parsing and analysis.
//!
//! Arbitrary input must either be rejected with an error or analyze cleanly;
//! nothing along the way may panic.

#![no_main]

use ab_config::{validate_experiment, ExperimentConfig};
use ab_core::analysis::{analyze, AnalysisOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = ExperimentConfig::from_str(text) else {
        return;
    };
    if validate_experiment(&config).is_err() {
        return;
    }
    // Cap the node count so oversized rules don't dominate the run.
    let options = AnalysisOptions {
        nodes: Some(config.quadrature.nodes.min(32)),
        credible_level: None,
    };
    let _ = analyze(&config, &options);
});
