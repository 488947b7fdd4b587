use thiserror::Error;

/// Top-level error type for the `onboard-api` crate.
///
/// Covers every failure mode of the device REST surface and the telemetry
/// transport. `onboard-core` maps these into engine diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Device rejected the credentials (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Device REST ─────────────────────────────────────────────────
    /// Structured error body returned by the device (`{code, message}`).
    #[error("Device API error (HTTP {status}): {message}")]
    Device { status: u16, message: String },

    /// The requested resource path does not exist on the device.
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Telemetry ───────────────────────────────────────────────────
    /// Usage record could not be delivered to the collector.
    #[error("Telemetry delivery failed: {0}")]
    Telemetry(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Device { status, .. } => *status == 503,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::NotFound { .. } | Self::Device { status: 404, .. } => true,
            _ => false,
        }
    }

    /// HTTP status attached to the failure, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Device { status, .. } => Some(*status),
            Self::Authentication { .. } => Some(401),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}
