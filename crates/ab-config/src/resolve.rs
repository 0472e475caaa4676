//! Experiment file resolution and loading.
//!
//! Resolution order: CLI argument → environment variables → XDG path → built-in example.

use std::path::{Path, PathBuf};

use crate::experiment::ExperimentConfig;
use crate::validate::{validate_experiment, ValidationResult};

/// Where the experiment configuration came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using the built-in reference experiment.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_EXPERIMENT_PATH: &str = "AB_EXPERIMENT_CONFIG";
pub const ENV_CONFIG_DIR: &str = "AB_CONFIG_DIR";

/// Standard experiment file name.
pub const EXPERIMENT_FILENAME: &str = "experiment.json";

/// Application name for XDG directories.
const APP_NAME: &str = "ab-analysis";

/// Resolve the experiment file path.
///
/// 1. Explicit CLI path (taken as-is, so a missing file is reported on load)
/// 2. `AB_EXPERIMENT_CONFIG`
/// 3. `AB_CONFIG_DIR` + `experiment.json`
/// 4. XDG config directory (`~/.config/ab-analysis/experiment.json`)
/// 5. Built-in reference experiment (None)
pub fn resolve_experiment_path(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliArgument);
    }

    if let Ok(env_path) = std::env::var(ENV_EXPERIMENT_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(EXPERIMENT_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(EXPERIMENT_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    (None, ConfigSource::BuiltinDefault)
}

/// Get the XDG config directory for the analysis tool.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Resolve, parse and validate the experiment configuration.
pub fn load_experiment(cli_path: Option<&Path>) -> ValidationResult<(ExperimentConfig, ConfigSource)> {
    let (path, source) = resolve_experiment_path(cli_path);
    let config = match path {
        Some(ref p) => ExperimentConfig::from_file(p)?,
        None => ExperimentConfig::default(),
    };
    validate_experiment(&config)?;
    Ok((config, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_cli_path_wins_even_if_missing() {
        let missing = Path::new("/nonexistent/experiment.json");
        let (path, source) = resolve_experiment_path(Some(missing));
        assert_eq!(path.as_deref(), Some(missing));
        assert_eq!(source, ConfigSource::CliArgument);

        let err = load_experiment(Some(missing)).unwrap_err();
        assert_eq!(err.code(), 60);
    }
}
