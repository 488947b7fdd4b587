// Usage telemetry transport
//
// A best-effort sink for usage records emitted after every run. Delivery
// failures are reported to the caller, which is expected to swallow them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Error;
use crate::transport::TransportConfig;

/// One usage record per processed declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub task_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Class name → number of declared objects of that class.
    pub class_counts: std::collections::BTreeMap<String, usize>,
    pub dry_run: bool,
    pub succeeded: bool,
    pub reboot_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Destination for usage records.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn report(&self, record: &UsageRecord) -> Result<(), Error>;
}

/// Sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

#[async_trait]
impl TelemetrySink for NoopTelemetry {
    async fn report(&self, _record: &UsageRecord) -> Result<(), Error> {
        Ok(())
    }
}

/// Posts each record as JSON to a collector endpoint.
pub struct HttpTelemetry {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpTelemetry {
    pub fn new(endpoint: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            endpoint,
        })
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetry {
    async fn report(&self, record: &UsageRecord) -> Result<(), Error> {
        debug!(endpoint = %self.endpoint, task_id = %record.task_id, "posting usage record");
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(record)
            .send()
            .await
            .map_err(|e| Error::Telemetry(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Telemetry(format!("collector answered HTTP {status}")))
        }
    }
}
