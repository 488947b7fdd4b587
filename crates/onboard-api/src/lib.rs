// onboard-api: async REST client seam and telemetry transport for appliance onboarding

pub mod client;
pub mod error;
pub mod telemetry;
pub mod transport;

pub use client::{DeviceClient, RestClient};
pub use error::Error;
pub use telemetry::{HttpTelemetry, NoopTelemetry, TelemetrySink, UsageRecord};
pub use transport::{TlsMode, TransportConfig};
