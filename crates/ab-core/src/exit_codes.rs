//! Exit codes for the ab-core CLI.
//!
//! Exit code ranges:
//! - 0-1: Operational outcomes (parse outcome from code, not output)
//! - 10-19: User/input errors (fixable by editing arguments or the experiment)
//! - 20-29: Internal errors (numerical failures, I/O)

use crate::error::CoreError;
use ab_config::ValidationError;
use ab_math::QuadratureError;

/// Exit codes for ab-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Validation ran, but an analytic value drifted past the tolerance
    /// from its simulated counterpart
    Divergent = 1,

    /// Invalid arguments
    ArgsError = 10,

    /// Experiment file failed to parse or validate
    ConfigError = 11,

    /// Observed data inconsistent with the model or a parameter out of range
    DataError = 12,

    /// Numerical failure (e.g. quadrature did not converge)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean)
    }

    /// Check if this exit code is a user/input error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Divergent => "OK_DIVERGENT",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::DataError => "ERR_DATA",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&CoreError> for ExitCode {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::Config(ValidationError::IoError(_)) => ExitCode::IoError,
            CoreError::Config(_) => ExitCode::ConfigError,
            CoreError::Quadrature(QuadratureError::Unstable { .. }) => ExitCode::InternalError,
            CoreError::InvalidParameter { .. }
            | CoreError::InconsistentObservation(_)
            | CoreError::Quadrature(_) => ExitCode::DataError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
