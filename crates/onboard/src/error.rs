//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use onboard_config::ConfigError;
use onboard_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const INVALID_DECLARATION: i32 = 5;
    pub const CONFIG: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input files ──────────────────────────────────────────────────
    #[error("Cannot read {path}")]
    #[diagnostic(
        code(onboard::file_not_found),
        help("Check the path passed to --declaration, --current, or --original.")
    )]
    FileNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}")]
    #[diagnostic(code(onboard::json), help("Check the file contents and try again."))]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not a device state file: {path}")]
    #[diagnostic(
        code(onboard::state_file),
        help(
            "State files map tenant → class → body, e.g.\n\
             {{ \"Common\": {{ \"DNS\": {{ \"nameServers\": [\"192.0.2.53\"] }} }} }}"
        )
    )]
    InvalidState {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Declaration ──────────────────────────────────────────────────
    #[error("Declaration rejected: {message}")]
    #[diagnostic(code(onboard::declaration))]
    Declaration { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(onboard::config),
        help("Run: onboard config path  to see which file is loaded")
    )]
    Config(#[from] ConfigError),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(onboard::render))]
    Render(String),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(onboard::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } => exit_code::NOT_FOUND,
            Self::InvalidJson { .. } | Self::InvalidState { .. } => exit_code::USAGE,
            Self::Declaration { .. } => exit_code::INVALID_DECLARATION,
            Self::Config(_) => exit_code::CONFIG,
            Self::Render(_) | Self::Internal(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { .. } | CoreError::Parse { .. } => Self::Declaration {
                message: err.to_string(),
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_errors_have_their_own_exit_code() {
        let err = CliError::from(CoreError::validation("bad unicast"));
        assert_eq!(err.exit_code(), exit_code::INVALID_DECLARATION);
        assert_eq!(err.to_string(), "Declaration rejected: bad unicast");
    }

    #[test]
    fn runtime_errors_are_general() {
        let err = CliError::from(CoreError::Busy);
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
