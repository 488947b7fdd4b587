// ── Runtime engine configuration ──
//
// These types describe how the engine reconciles and how it reaches the
// device. They never touch disk: onboard-config (or a test) builds them
// and hands them to `Engine::new`.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use onboard_api::{RestClient, TlsMode, TransportConfig};

use crate::error::CoreError;
use crate::model::StatusCodeMode;
use crate::normalize::classes::CLASSES_OF_TRUTH;

/// Fields the device stamps on every object that never reflect intent.
pub const DEFAULT_VOLATILE_FIELDS: &[&str] = &["generation", "lastUpdateMicros", "selfLink"];

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed management certificates). Default
    /// for freshly booted appliances.
    #[default]
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// How to reach the appliance's management REST API.
#[derive(Debug, Clone)]
pub struct DeviceConnection {
    /// Management URL (e.g. `https://192.0.2.10`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl DeviceConnection {
    /// Build the REST client appliers use to talk to the device.
    pub fn build_client(&self) -> Result<RestClient, CoreError> {
        let transport = TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
            ..TransportConfig::default()
        };
        Ok(RestClient::new(
            self.url.clone(),
            self.username.clone(),
            self.password.clone(),
            &transport,
        )?)
    }
}

/// Knobs for the reconcile pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Classes that are reset to the original baseline when omitted from a
    /// declaration.
    pub classes_of_truth: Vec<String>,
    /// Object keys stripped from both sides before diffing.
    pub volatile_fields: Vec<String>,
    /// Default poll status mode when the caller does not pick one.
    pub status_code_mode: StatusCodeMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            classes_of_truth: CLASSES_OF_TRUTH.iter().map(|c| (*c).to_owned()).collect(),
            volatile_fields: DEFAULT_VOLATILE_FIELDS
                .iter()
                .map(|f| (*f).to_owned())
                .collect(),
            status_code_mode: StatusCodeMode::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_config_carries_builtin_lists() {
        let config = EngineConfig::default();
        assert!(config.classes_of_truth.iter().any(|c| c == "VLAN"));
        assert!(config.volatile_fields.iter().any(|f| f == "generation"));
        assert_eq!(config.status_code_mode, StatusCodeMode::Legacy);
    }

    #[test]
    fn connection_builds_client() {
        let conn = DeviceConnection {
            url: Url::parse("https://192.0.2.10").unwrap(),
            username: "admin".into(),
            password: SecretString::from("admin".to_string()),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(5),
        };
        let client = conn.build_client().unwrap();
        assert_eq!(client.base_url().as_str(), "https://192.0.2.10/");
    }
}
