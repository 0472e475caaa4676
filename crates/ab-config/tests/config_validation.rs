//! Experiment config loading, validation and resolution against real files.
//!
//! Covers:
//! - JSON files written to a temp dir and loaded through `from_file`
//! - Resolution order (CLI > env path > env config dir > builtin)
//! - Validation error codes for broken experiments

use ab_config::resolve::{xdg_config_dir, ENV_CONFIG_DIR, ENV_EXPERIMENT_PATH, EXPERIMENT_FILENAME};
use ab_config::{
    load_experiment, resolve_experiment_path, validate_experiment, BernoulliExponentialSample,
    BetaParams, CompoundSection, ConfigSource, ExperimentConfig, GammaParams, ValidationError,
};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let saved = keys.iter().map(|k| env::var(k).ok()).collect();
        for key in keys {
            env::remove_var(key);
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, saved) in self.keys.iter().zip(&self.saved) {
            match saved {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_config(path: &Path, config: &ExperimentConfig) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create config parent");
    }
    let json = serde_json::to_string_pretty(config).expect("serialize config");
    fs::write(path, json).expect("write config");
}

fn compound_config() -> ExperimentConfig {
    ExperimentConfig {
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
                indicators: vec![1, 0, 0, 1],
                magnitudes: vec![80.0, 0.0, 0.0, 120.0],
            },
            b: BernoulliExponentialSample {
                indicators: vec![0, 1, 1, 0],
                magnitudes: vec![0.0, 95.0, 60.0, 0.0],
            },
        }),
        ..ExperimentConfig::default()
    }
}

#[test]
fn file_roundtrip_preserves_compound_section() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("exp.json");
    let config = compound_config();
    write_config(&path, &config);

    let loaded = ExperimentConfig::from_file(&path).expect("load config");
    assert_eq!(loaded, config);
    assert!(validate_experiment(&loaded).is_ok());
}

#[test]
fn mismatched_compound_lengths_fail_validation() {
    let mut config = compound_config();
    if let Some(ref mut compound) = config.compound {
        compound.b.magnitudes.pop();
    }
    let err = validate_experiment(&config).unwrap_err();
    assert!(matches!(err, ValidationError::SemanticError(ref msg) if msg.contains("compound.b")));
}

#[test]
fn non_positive_prior_is_invalid_value() {
    let mut config = ExperimentConfig::default();
    config.revenue.prior.sigma = 0.0;
    match validate_experiment(&config) {
        Err(ValidationError::InvalidValue { field, .. }) => assert_eq!(field, "revenue.prior.sigma"),
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn unknown_family_tag_is_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("broken.json");
    fs::write(&path, r#"{"schema_version": "1.0.0", "conversion": 3}"#).expect("write");
    let err = ExperimentConfig::from_file(&path).unwrap_err();
    assert_eq!(err.code(), 61);
}

#[test]
fn cli_path_beats_environment() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_EXPERIMENT_PATH, ENV_CONFIG_DIR]);
        let dir = TempDir::new().expect("tempdir");
        let cli = dir.path().join("cli.json");
        let from_env = dir.path().join("env.json");
        write_config(&cli, &ExperimentConfig::default());
        write_config(&from_env, &compound_config());
        env::set_var(ENV_EXPERIMENT_PATH, &from_env);

        let (config, source) = load_experiment(Some(&cli)).expect("load");
        assert_eq!(source, ConfigSource::CliArgument);
        assert!(config.compound.is_none());
    });
}

#[test]
fn environment_path_then_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_EXPERIMENT_PATH, ENV_CONFIG_DIR]);
        let dir = TempDir::new().expect("tempdir");
        let direct = dir.path().join("direct.json");
        let config_dir = dir.path().join("conf");
        write_config(&direct, &compound_config());
        write_config(&config_dir.join(EXPERIMENT_FILENAME), &ExperimentConfig::default());

        env::set_var(ENV_CONFIG_DIR, &config_dir);
        let (path, source) = resolve_experiment_path(None);
        assert_eq!(source, ConfigSource::Environment);
        assert_eq!(path, Some(config_dir.join(EXPERIMENT_FILENAME)));

        env::set_var(ENV_EXPERIMENT_PATH, &direct);
        let (config, source) = load_experiment(None).expect("load");
        assert_eq!(source, ConfigSource::Environment);
        assert!(config.compound.is_some());
    });
}

#[test]
fn missing_env_file_falls_through() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_EXPERIMENT_PATH, ENV_CONFIG_DIR]);
        env::set_var(ENV_EXPERIMENT_PATH, "/nonexistent/experiment.json");

        let xdg_present = xdg_config_dir()
            .map(|d| d.join(EXPERIMENT_FILENAME).exists())
            .unwrap_or(false);
        let (path, source) = resolve_experiment_path(None);
        if xdg_present {
            assert_eq!(source, ConfigSource::XdgConfig);
        } else {
            assert_eq!(source, ConfigSource::BuiltinDefault);
            assert!(path.is_none());
            let (config, _) = load_experiment(None).expect("builtin default loads");
            assert_eq!(config, ExperimentConfig::default());
        }
    });
}
