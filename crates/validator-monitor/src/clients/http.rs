//! Shared HTTP plumbing for all data-source clients.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::{ProxyConfig, RequestsConfig};
use crate::error::TransportError;

/// Safari on macOS; some public APIs reject obvious non-browser agents.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Safari/605.1.15";

/// Longest response excerpt kept in error messages.
const MAX_ERROR_BODY: usize = 300;

/// JSON-over-HTTP client with a per-request timeout, optional proxy and an
/// optional pause after every request.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    delay_between_requests: Duration,
}

impl HttpClient {
    /// Build the client from configuration.
    pub fn new(requests: &RequestsConfig, proxy: &ProxyConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(requests.timeout())
            .user_agent(USER_AGENT);

        if let Some(url) = proxy.url() {
            debug!("Routing requests through proxy");
            builder = builder.proxy(reqwest::Proxy::all(url)?);
        }

        Ok(Self {
            client: builder.build()?,
            delay_between_requests: requests.delay_between_requests(),
        })
    }

    /// Wrap an existing client without any delay.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            delay_between_requests: Duration::ZERO,
        }
    }

    /// GET `url` and decode the JSON body of a successful response.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        let (_, value) = self.get(url, false).await?;
        Ok(value)
    }

    /// GET `url`, also decoding JSON bodies of client errors (4xx).
    ///
    /// The status is returned so the caller can tell a meaningful 4xx
    /// payload (e.g. "not found") from a refusal.
    pub async fn get_json_with_status<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<(StatusCode, T), TransportError> {
        self.get(url, true).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        accept_client_errors: bool,
    ) -> Result<(StatusCode, T), TransportError> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await;
        self.pause().await;
        decode(response?, accept_client_errors).await
    }

    /// POST `body` as JSON to `url` and decode the JSON reply.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        debug!(url, "POST");
        let response = self.client.post(url).json(body).send().await;
        self.pause().await;
        let (_, value) = decode(response?, false).await?;
        Ok(value)
    }

    async fn pause(&self) {
        if !self.delay_between_requests.is_zero() {
            tokio::time::sleep(self.delay_between_requests).await;
        }
    }
}

/// Decode a JSON body.
///
/// Non-success statuses are transport failures, except client errors when
/// `accept_client_errors` is set and the body is JSON. Undecodable bodies
/// are transport failures too.
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    accept_client_errors: bool,
) -> Result<(StatusCode, T), TransportError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    let accepted = status.is_success() || (accept_client_errors && status.is_client_error());
    if !accepted {
        return Err(TransportError::Status {
            status,
            body: excerpt(&bytes),
        });
    }

    match serde_json::from_slice::<T>(&bytes) {
        Ok(value) => Ok((status, value)),
        Err(e) if status.is_success() => Err(TransportError::UnexpectedResponse(format!(
            "invalid JSON ({e}): {}",
            excerpt(&bytes)
        ))),
        Err(_) => Err(TransportError::Status {
            status,
            body: excerpt(&bytes),
        }),
    }
}

pub(super) fn excerpt(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(MAX_ERROR_BODY)
        .collect()
}
