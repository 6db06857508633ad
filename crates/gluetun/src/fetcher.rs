use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::auth::GluetunAuth;
use crate::error::{FetchError, Result};

/// Timeout applied to every request sent to Gluetun
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches the forwarded port from the Gluetun control server
#[derive(Clone)]
pub struct PortFetcher {
    client: Client,
    url: String,
}

impl PortFetcher {
    /// Create a fetcher for the port forwarding endpoint at `url`
    ///
    /// # Arguments
    /// * `url` - Full URL, e.g. `http://localhost:8000/v1/portforward`
    /// * `auth` - Authentication sent with every request
    pub fn new(url: &str, auth: GluetunAuth) -> Result<Self> {
        let client = Client::builder()
            .default_headers(auth.headers())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Ask Gluetun for the currently forwarded port
    ///
    /// Authentication failures are reported, never retried. A body without
    /// a positive `port` counts as no port.
    pub async fn forwarded_port(&self) -> Result<u16> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized(status));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let port = parse_port(&body)?;
        tracing::debug!("Gluetun reports forwarded port {}", port);
        Ok(port)
    }
}

/// Extract the `port` field of a Gluetun answer like `{"port":55000}`
fn parse_port(body: &str) -> Result<u16> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    value
        .get("port")
        .and_then(Value::as_u64)
        .filter(|port| *port > 0)
        .and_then(|port| u16::try_from(port).ok())
        .ok_or(FetchError::NoPort)
}
