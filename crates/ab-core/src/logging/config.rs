//! Where the log level and format come from.
//!
//! Level resolution, highest first: `-v`/`-q`, `AB_LOG`, `RUST_LOG`, then
//! `info`. `RUST_LOG` is passed through as a full filter directive so
//! per-target settings survive; every other source becomes one level applied
//! to the workspace crates.

use serde::{Deserialize, Serialize};

/// Environment variable holding the log level.
pub const ENV_LOG_LEVEL: &str = "AB_LOG";
/// Environment variable holding the log format.
pub const ENV_LOG_FORMAT: &str = "AB_LOG_FORMAT";
/// Standard tracing filter variable, honoured only when nothing above it is set.
pub const ENV_RUST_LOG: &str = "RUST_LOG";

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per event.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        })
    }
}

/// Verbosity applied to the analysis crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "quiet" => Ok(LogLevel::Off),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        })
    }
}

impl LogLevel {
    /// Level for a `-v` count, or `error` under `-q`.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => LogLevel::Error,
            (false, 0) => LogLevel::Info,
            (false, 1) => LogLevel::Debug,
            (false, _) => LogLevel::Trace,
        }
    }
}

/// Which input decided the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    Cli,
    AbLog,
    RustLog,
    Default,
}

/// Resolved logging setup for one process.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    pub source: LevelSource,
    /// Raw `RUST_LOG` directive, kept only when it decided the level.
    pub directives: Option<String>,
    /// Timestamps on human output.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            source: LevelSource::Default,
            directives: None,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment and CLI flags.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(cli_level, cli_format, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve<F>(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LogConfig::default();

        let ab_log = lookup(ENV_LOG_LEVEL).and_then(|v| v.parse::<LogLevel>().ok());
        let rust_log = lookup(ENV_RUST_LOG).filter(|v| !v.trim().is_empty());

        if let Some(level) = cli_level {
            config.level = level;
            config.source = LevelSource::Cli;
        } else if let Some(level) = ab_log {
            config.level = level;
            config.source = LevelSource::AbLog;
        } else if let Some(directives) = rust_log {
            // a bare level like `debug` also sets the reported level
            if let Ok(level) = directives.parse::<LogLevel>() {
                config.level = level;
            }
            config.source = LevelSource::RustLog;
            config.directives = Some(directives);
        }

        config.format = cli_format
            .or_else(|| lookup(ENV_LOG_FORMAT).and_then(|v| v.parse().ok()))
            .unwrap_or_default();

        config
    }

    /// `EnvFilter` directive string for this configuration.
    pub fn filter_directives(&self) -> String {
        match (&self.source, &self.directives) {
            (LevelSource::RustLog, Some(raw)) => raw.clone(),
            _ => crate_directives(self.level),
        }
    }
}

/// The same level on every workspace crate.
pub fn crate_directives(level: LogLevel) -> String {
    format!("ab_core={level},ab_math={level},ab_config={level}")
}
