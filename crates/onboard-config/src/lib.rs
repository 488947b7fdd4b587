//! Shared configuration for the onboard tooling.
//!
//! A TOML file plus `ONBOARD_` environment overrides, credential
//! resolution for the device account, and translation into the runtime
//! types `onboard_core` consumes (`EngineConfig`, `DeviceConnection`, a
//! telemetry sink).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use onboard_api::{HttpTelemetry, NoopTelemetry, TelemetrySink, TransportConfig};
use onboard_core::{DeviceConnection, EngineConfig, StatusCodeMode, TlsVerification};

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `ONBOARD_DEVICE__URL`.
pub const ENV_PREFIX: &str = "ONBOARD_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no device password configured")]
    NoCredentials,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceSection,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub telemetry: TelemetrySection,
}

/// The appliance being onboarded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceSection {
    /// Management URL (e.g., "https://192.0.2.10").
    pub url: Option<String>,

    #[serde(default = "default_username")]
    pub username: String,

    /// Password (plaintext, prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to a CA certificate for the management interface.
    pub ca_cert: Option<PathBuf>,

    /// Accept any certificate. Unset means accept, since a fresh
    /// appliance serves a self-signed certificate.
    pub insecure: Option<bool>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            url: None,
            username: default_username(),
            password: None,
            password_env: None,
            ca_cert: None,
            insecure: None,
            timeout: default_timeout(),
        }
    }
}

fn default_username() -> String {
    "admin".into()
}
fn default_timeout() -> u64 {
    30
}

/// Reconcile pipeline knobs. Unset lists fall back to the built-in ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineSection {
    pub classes_of_truth: Option<Vec<String>>,

    pub volatile_fields: Option<Vec<String>>,

    /// "legacy" or "experimental".
    #[serde(default = "default_status_code_mode")]
    pub status_code_mode: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            classes_of_truth: None,
            volatile_fields: None,
            status_code_mode: default_status_code_mode(),
        }
    }
}

fn default_status_code_mode() -> String {
    StatusCodeMode::default().to_string()
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TelemetrySection {
    #[serde(default)]
    pub enabled: bool,

    /// Collector URL usage records are posted to.
    pub endpoint: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "onboard", "onboard").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("onboard");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the device password: the variable named by `password_env`
/// first, then the plaintext value.
pub fn resolve_password(device: &DeviceSection) -> Result<SecretString, ConfigError> {
    if let Some(val) = device
        .password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(SecretString::from(val));
    }

    device
        .password
        .clone()
        .map(SecretString::from)
        .ok_or(ConfigError::NoCredentials)
}

// ── Translation to runtime types ────────────────────────────────────

pub fn to_engine_config(cfg: &Config) -> Result<EngineConfig, ConfigError> {
    let engine = &cfg.engine;
    let status_code_mode: StatusCodeMode = engine.status_code_mode.parse().map_err(|_| {
        ConfigError::invalid(
            "engine.status_code_mode",
            format!(
                "expected 'legacy' or 'experimental', got '{}'",
                engine.status_code_mode
            ),
        )
    })?;

    let defaults = EngineConfig::default();
    Ok(EngineConfig {
        classes_of_truth: engine
            .classes_of_truth
            .clone()
            .unwrap_or(defaults.classes_of_truth),
        volatile_fields: engine
            .volatile_fields
            .clone()
            .unwrap_or(defaults.volatile_fields),
        status_code_mode,
    })
}

pub fn to_device_connection(cfg: &Config) -> Result<DeviceConnection, ConfigError> {
    let device = &cfg.device;
    let raw = device
        .url
        .as_deref()
        .ok_or_else(|| ConfigError::invalid("device.url", "not set"))?;
    let url: Url = raw
        .parse()
        .map_err(|_| ConfigError::invalid("device.url", format!("invalid URL: {raw}")))?;

    let tls = match (device.insecure, &device.ca_cert) {
        (Some(true), _) | (None, None) => TlsVerification::DangerAcceptInvalid,
        (_, Some(ca_path)) => TlsVerification::CustomCa(ca_path.clone()),
        (Some(false), None) => TlsVerification::SystemDefaults,
    };

    Ok(DeviceConnection {
        url,
        username: device.username.clone(),
        password: resolve_password(device)?,
        tls,
        timeout: Duration::from_secs(device.timeout),
    })
}

/// The configured usage sink. Disabled telemetry gets a sink that drops
/// every record.
pub fn telemetry_sink(cfg: &Config) -> Result<Arc<dyn TelemetrySink>, ConfigError> {
    let telemetry = &cfg.telemetry;
    if !telemetry.enabled {
        return Ok(Arc::new(NoopTelemetry));
    }
    let raw = telemetry
        .endpoint
        .as_deref()
        .ok_or_else(|| ConfigError::invalid("telemetry.endpoint", "required when enabled"))?;
    let endpoint: Url = raw
        .parse()
        .map_err(|_| ConfigError::invalid("telemetry.endpoint", format!("invalid URL: {raw}")))?;
    let sink = HttpTelemetry::new(endpoint, &TransportConfig::default())
        .map_err(|e| ConfigError::invalid("telemetry.endpoint", e.to_string()))?;
    Ok(Arc::new(sink))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn with_url(url: &str) -> Config {
        let mut cfg = Config::default();
        cfg.device.url = Some(url.into());
        cfg.device.password = Some("admin".into());
        cfg
    }

    #[test]
    fn default_engine_section_matches_core_defaults() {
        let engine = to_engine_config(&Config::default()).unwrap();
        assert_eq!(engine, EngineConfig::default());
    }

    #[test]
    fn unknown_status_code_mode_is_rejected() {
        let mut cfg = Config::default();
        cfg.engine.status_code_mode = "strict".into();
        let err = to_engine_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("engine.status_code_mode"));
    }

    #[test]
    fn tls_mode_follows_insecure_and_ca() {
        let mut cfg = with_url("https://192.0.2.10");
        assert_eq!(
            to_device_connection(&cfg).unwrap().tls,
            TlsVerification::DangerAcceptInvalid
        );

        cfg.device.insecure = Some(false);
        assert_eq!(
            to_device_connection(&cfg).unwrap().tls,
            TlsVerification::SystemDefaults
        );

        cfg.device.ca_cert = Some(PathBuf::from("/etc/onboard/ca.pem"));
        assert_eq!(
            to_device_connection(&cfg).unwrap().tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/onboard/ca.pem"))
        );

        cfg.device.insecure = Some(true);
        assert_eq!(
            to_device_connection(&cfg).unwrap().tls,
            TlsVerification::DangerAcceptInvalid
        );
    }

    #[test]
    fn connection_requires_url_and_password() {
        let err = to_device_connection(&Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "device.url"));

        let mut cfg = with_url("https://192.0.2.10");
        cfg.device.password = None;
        assert!(matches!(
            to_device_connection(&cfg).unwrap_err(),
            ConfigError::NoCredentials
        ));
    }

    #[test]
    fn plaintext_password_is_used() {
        let cfg = with_url("https://192.0.2.10");
        let password = resolve_password(&cfg.device).unwrap();
        assert_eq!(password.expose_secret(), "admin");
    }

    #[test]
    fn telemetry_requires_endpoint_when_enabled() {
        let mut cfg = Config::default();
        assert!(telemetry_sink(&cfg).is_ok());

        cfg.telemetry.enabled = true;
        assert!(telemetry_sink(&cfg).is_err());

        cfg.telemetry.endpoint = Some("https://collector.example.com/usage".into());
        assert!(telemetry_sink(&cfg).is_ok());
    }
}
