// Device management REST client
//
// `DeviceClient` is the seam appliers talk to: list/get/create/modify/
// replace/delete against collection paths like `/tm/net/vlan`. `RestClient`
// implements it over `reqwest` with basic auth and the iControl-style
// `{ kind, items }` list envelope.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Management REST surface of a single appliance.
///
/// Paths are relative to the management root (e.g. `/tm/net/vlan`,
/// `/tm/net/vlan/~Common~external`). Implementations must be safe to share
/// across tasks; the orchestrator hands one `Arc<dyn DeviceClient>` to
/// every applier.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// List every item of a collection.
    async fn list(&self, path: &str) -> Result<Vec<Value>, Error>;

    /// Fetch a single resource.
    async fn get(&self, path: &str) -> Result<Value, Error>;

    /// Create a resource in a collection (POST).
    async fn create(&self, path: &str, body: &Value) -> Result<Value, Error>;

    /// Partially update a resource (PATCH).
    async fn modify(&self, path: &str, body: &Value) -> Result<Value, Error>;

    /// Replace a resource wholesale (PUT).
    async fn replace(&self, path: &str, body: &Value) -> Result<Value, Error>;

    /// Delete a resource.
    async fn delete(&self, path: &str) -> Result<(), Error>;
}

/// `{ "code": 400, "message": "..." }` error body.
#[derive(Deserialize)]
struct DeviceErrorBody {
    code: Option<u16>,
    message: Option<String>,
}

/// `{ "kind": "...", "items": [...] }` collection envelope.
#[derive(Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    items: Vec<Value>,
}

/// Raw HTTP client for an appliance's management REST API.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
}

impl RestClient {
    /// Create a client from a `TransportConfig` and basic-auth credentials.
    ///
    /// `base_url` is the device root (e.g. `https://192.0.2.10`); requests
    /// go to `{base_url}/mgmt{path}`.
    pub fn new(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, username, password))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
        }
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/mgmt/{path}`.
    pub(crate) fn mgmt_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/mgmt/{path}"))?)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.username, Some(self.password.expose_secret()))
    }

    async fn send(&self, builder: reqwest::RequestBuilder, path: &str) -> Result<Value, Error> {
        let resp = self.authed(builder).send().await?;
        parse_response(resp, path).await
    }
}

#[async_trait]
impl DeviceClient for RestClient {
    async fn list(&self, path: &str) -> Result<Vec<Value>, Error> {
        let url = self.mgmt_url(path)?;
        debug!("GET {}", url);
        let body = self.send(self.http.get(url), path).await?;
        let envelope: ListEnvelope =
            serde_json::from_value(body.clone()).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.to_string(),
            })?;
        Ok(envelope.items)
    }

    async fn get(&self, path: &str) -> Result<Value, Error> {
        let url = self.mgmt_url(path)?;
        debug!("GET {}", url);
        self.send(self.http.get(url), path).await
    }

    async fn create(&self, path: &str, body: &Value) -> Result<Value, Error> {
        let url = self.mgmt_url(path)?;
        debug!("POST {}", url);
        self.send(self.http.post(url).json(body), path).await
    }

    async fn modify(&self, path: &str, body: &Value) -> Result<Value, Error> {
        let url = self.mgmt_url(path)?;
        debug!("PATCH {}", url);
        self.send(self.http.patch(url).json(body), path).await
    }

    async fn replace(&self, path: &str, body: &Value) -> Result<Value, Error> {
        let url = self.mgmt_url(path)?;
        debug!("PUT {}", url);
        self.send(self.http.put(url).json(body), path).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.mgmt_url(path)?;
        debug!("DELETE {}", url);
        self.send(self.http.delete(url), path).await.map(|_| ())
    }
}

/// Map HTTP status and body into a JSON value or a typed error.
///
/// Empty success bodies (DELETE) become `Value::Null`.
async fn parse_response(resp: reqwest::Response, path: &str) -> Result<Value, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "device rejected credentials".into(),
        });
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound { path: path.into() });
    }

    let body = resp.text().await?;

    if !status.is_success() {
        let message = match serde_json::from_str::<DeviceErrorBody>(&body) {
            Ok(DeviceErrorBody {
                message: Some(message),
                ..
            }) => message,
            _ => body.chars().take(200).collect(),
        };
        return Err(Error::Device {
            status: status.as_u16(),
            message,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let value: Value = serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })?;

    // Some endpoints answer 200 with an embedded error object.
    if let Ok(DeviceErrorBody {
        code: Some(code),
        message: Some(message),
    }) = serde_json::from_value::<DeviceErrorBody>(value.clone())
    {
        if code >= 400 {
            return Err(Error::Device {
                status: code,
                message,
            });
        }
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> RestClient {
        RestClient::with_client(
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
            "admin".into(),
            SecretString::from("secret".to_string()),
        )
    }

    #[test]
    fn mgmt_url_joins_without_double_slashes() {
        let c = client("https://192.0.2.10/");
        assert_eq!(
            c.mgmt_url("/tm/net/vlan").unwrap().as_str(),
            "https://192.0.2.10/mgmt/tm/net/vlan"
        );
        assert_eq!(
            c.mgmt_url("tm/sys/provision").unwrap().as_str(),
            "https://192.0.2.10/mgmt/tm/sys/provision"
        );
    }
}
