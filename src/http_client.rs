use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

use crate::error::EcobeeError;

pub const DEFAULT_API_BASE: &str = "https://api.ecobee.com";
pub const DEFAULT_WEATHER_BASE: &str = "https://api.openweathermap.org";

/// Provider base URLs, overridable so tests can point at a local stub
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_base: String,
    pub weather_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            weather_base: DEFAULT_WEATHER_BASE.to_string(),
        }
    }
}

impl Endpoints {
    pub fn token_url(&self) -> String {
        format!("{}/token", self.api_base.trim_end_matches('/'))
    }

    pub fn thermostat_url(&self) -> String {
        format!("{}/1/thermostat", self.api_base.trim_end_matches('/'))
    }

    pub fn weather_url(&self) -> String {
        format!("{}/data/2.5/weather", self.weather_base.trim_end_matches('/'))
    }
}

/// HTTP client shared by the credential manager, thermostat fetcher and collaborators
///
/// Requests are issued once; transport failures are classified and returned,
/// never retried here.
#[derive(Clone)]
pub struct EcobeeHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Provider endpoints
    endpoints: Endpoints,
}

impl EcobeeHttpClient {
    /// Create a new HTTP client
    pub fn new(endpoints: Endpoints, connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .user_agent(concat!("ecobee-poller/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, endpoints })
    }

    /// Execute a request and read the full body as text
    ///
    /// The HTTP status is returned alongside the body; callers decide what it means.
    pub async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), EcobeeError> {
        let request = request.build().map_err(transport_error)?;
        let method = request.method().clone();
        let url = redact_url(request.url());

        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let response = self.client.execute(request).await.map_err(|e| {
            let err = transport_error(e);
            tracing::warn!(url = %url, error = %err, "HTTP request error");
            err
        })?;

        let status = response.status();
        tracing::debug!(status = %status, "Received HTTP response");

        let body = response.text().await.map_err(transport_error)?;
        Ok((status, body))
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

/// Categorize a reqwest error for logging
pub fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else if e.is_builder() {
        "builder_error"
    } else {
        "unknown"
    }
}

fn transport_error(source: reqwest::Error) -> EcobeeError {
    EcobeeError::Transport {
        kind: error_kind(&source),
        source,
    }
}

/// Drop query parameters so codes and keys never reach the logs
fn redact_url(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
