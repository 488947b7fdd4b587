// ── Core error types ──
//
// Engine-facing errors from onboard-core. Transport-layer failures from
// `onboard_api` are folded into `DeviceCommunication`; applier failures
// keep their message verbatim because callers match on the exact text.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Declaration errors ───────────────────────────────────────────
    /// Structurally contradictory declaration, detected before any device call.
    #[error("{message}")]
    Validation { message: String },

    /// The raw document could not be turned into a parsed declaration.
    #[error("Invalid declaration: {message}")]
    Parse { message: String },

    // ── Apply errors ─────────────────────────────────────────────────
    /// A device REST call failed.
    #[error("{message}")]
    DeviceCommunication {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    /// A domain applier rejected its slice of the change set.
    #[error("{message}")]
    Applier { applier: String, message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Device is busy, another declaration is being processed")]
    Busy,

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn applier(applier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Applier {
            applier: applier.into(),
            message: message.into(),
        }
    }

    /// Result code reported for this error when it settles a task or
    /// rejects a request.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. }
            | Self::Parse { .. }
            | Self::DeviceCommunication { .. }
            | Self::Applier { .. } => 422,
            Self::Busy => 503,
            Self::TaskNotFound { .. } => 404,
            Self::Config { .. } | Self::Internal(_) => 500,
        }
    }

    /// `true` for errors raised before the device was touched.
    pub fn is_pre_apply(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Parse { .. })
    }

    /// `true` when resubmitting the same declaration later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<onboard_api::Error> for CoreError {
    fn from(err: onboard_api::Error) -> Self {
        match err {
            onboard_api::Error::Device { status, message } => CoreError::DeviceCommunication {
                message,
                status: Some(status),
            },
            onboard_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            other => CoreError::DeviceCommunication {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applier_message_is_not_wrapped() {
        let err = CoreError::applier("Network", "invalid config - rolled back");
        assert_eq!(err.to_string(), "invalid config - rolled back");
    }

    #[test]
    fn device_error_keeps_status() {
        let err = CoreError::from(onboard_api::Error::Device {
            status: 400,
            message: "01070734:3: Configuration error".into(),
        });
        match err {
            CoreError::DeviceCommunication { status, message } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "01070734:3: Configuration error");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_codes() {
        assert_eq!(CoreError::Busy.status_code(), 503);
        assert_eq!(CoreError::validation("x").status_code(), 422);
        assert!(CoreError::validation("x").is_pre_apply());
        assert!(!CoreError::applier("Dsc", "x").is_pre_apply());
    }
}
