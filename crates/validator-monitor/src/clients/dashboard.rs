//! Dashboard (dashtec) API client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::http::excerpt;
use super::{de, ActiveStats, Dashboard, DashboardStats, HttpClient, QueuePosition};
use crate::config::{ApiConfig, VALIDATOR_ADDRESS_PLACEHOLDER};
use crate::error::TransportError;

/// Error message the dashboard returns for unknown addresses.
const NOT_FOUND_MESSAGE: &str = "validator not found.";

/// Dashboard statuses meaning the validator has left the set.
const EXITED_STATUSES: &[&str] = &["exiting", "zombie"];

/// Rank reported when the queue entry carries no position.
const UNKNOWN_QUEUE_POSITION: u64 = 999_999;

/// Validator payload as sent by the dashboard; every field is optional and
/// the shape decides which [`DashboardStats`] variant it becomes. Fields
/// that are present must still have the expected type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValidator {
    #[serde(default)]
    index: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_amount")]
    balance: Option<u128>,
    #[serde(default, deserialize_with = "de::opt_amount")]
    unclaimed_rewards: Option<u128>,
    #[serde(default)]
    attestation_success: Option<Value>,
    #[serde(default, deserialize_with = "de::opt_u64_lenient")]
    total_attestations_succeeded: Option<u64>,
    #[serde(default, deserialize_with = "de::opt_u64_lenient")]
    total_attestations_missed: Option<u64>,
    #[serde(default, deserialize_with = "de::opt_u64_lenient")]
    total_blocks_proposed: Option<u64>,
    #[serde(default, deserialize_with = "de::opt_u64_lenient")]
    total_blocks_mined: Option<u64>,
    #[serde(default, deserialize_with = "de::opt_u64_lenient")]
    total_blocks_missed: Option<u64>,
}

impl RawValidator {
    fn into_stats(self) -> DashboardStats {
        let status_label = self.status.clone().unwrap_or_default();
        let exited = EXITED_STATUSES
            .iter()
            .any(|s| status_label.trim().eq_ignore_ascii_case(s));

        if exited {
            return DashboardStats::Exited { status_label };
        }

        if self.index.is_some_and(|index| !index.is_null()) {
            return DashboardStats::Active(ActiveStats {
                status_label,
                balance: self.balance.unwrap_or_default(),
                unclaimed_rewards: self.unclaimed_rewards.unwrap_or_default(),
                attestations_succeeded: self.total_attestations_succeeded.unwrap_or_default(),
                attestations_missed: self.total_attestations_missed.unwrap_or_default(),
                attestation_success_label: self.attestation_success.map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
                blocks_proposed: self.total_blocks_proposed.unwrap_or_default(),
                blocks_mined: self.total_blocks_mined.unwrap_or_default(),
                blocks_missed: self.total_blocks_missed.unwrap_or_default(),
            });
        }

        DashboardStats::Unknown
    }
}

/// Classify a validator reply.
///
/// A "not found" error is an answer whatever the status. Any other error
/// reply, a refusal (4xx) or a payload with mistyped fields is a failure so
/// the caller can retry it; only well-formed payloads the dashboard does not
/// describe become [`DashboardStats::Unknown`].
pub fn parse_validator(
    status: StatusCode,
    payload: Value,
) -> Result<DashboardStats, TransportError> {
    let Some(object) = payload.as_object() else {
        return Err(TransportError::UnexpectedResponse(format!(
            "validator payload is not an object: {}",
            excerpt(payload.to_string().as_bytes())
        )));
    };

    let error = object.get("error").map(|e| match e {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    if error
        .as_deref()
        .is_some_and(|e| e.trim().eq_ignore_ascii_case(NOT_FOUND_MESSAGE))
    {
        return Ok(DashboardStats::NotFound);
    }

    if !status.is_success() {
        return Err(TransportError::Status {
            status,
            body: excerpt(payload.to_string().as_bytes()),
        });
    }

    if let Some(error) = error {
        return Err(TransportError::UnexpectedResponse(format!(
            "dashboard error: {error}"
        )));
    }

    match serde_json::from_value::<RawValidator>(payload) {
        Ok(raw) => Ok(raw.into_stats()),
        Err(e) => {
            debug!(error = %e, "Malformed dashboard payload");
            Err(TransportError::UnexpectedResponse(format!(
                "malformed validator payload: {e}"
            )))
        }
    }
}

/// Interpret a queue search result.
pub fn parse_queue(payload: &Value) -> Result<QueuePosition, TransportError> {
    let Some(object) = payload.as_object().filter(|o| !o.is_empty()) else {
        return Err(TransportError::UnexpectedResponse(format!(
            "empty queue response: {payload}"
        )));
    };

    let first = object
        .get("validatorsInQueue")
        .and_then(Value::as_array)
        .and_then(|entries| entries.first());

    Ok(match first {
        Some(entry) => QueuePosition::Ranked(
            entry
                .get("position")
                .and_then(|p| p.as_u64().or_else(|| p.as_str()?.trim().parse().ok()))
                .unwrap_or(UNKNOWN_QUEUE_POSITION),
        ),
        None => QueuePosition::NotRegistered,
    })
}

/// Client for the validator dashboard REST API.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: HttpClient,
    base_url: String,
    endpoint: String,
}

impl DashboardClient {
    pub fn new(http: HttpClient, api: &ApiConfig) -> Self {
        Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            endpoint: api.endpoint.clone(),
        }
    }

    fn validator_url(&self, address: &str) -> String {
        let endpoint = self.endpoint.replace(VALIDATOR_ADDRESS_PLACEHOLDER, address);
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn queue_url(&self, address: &str) -> String {
        format!(
            "{}/validators/queue?page=1&limit=10&search={address}",
            self.base_url
        )
    }
}

#[async_trait]
impl Dashboard for DashboardClient {
    async fn fetch_dashboard_stats(&self, address: &str) -> Result<DashboardStats, TransportError> {
        let (status, payload): (StatusCode, Value) = self
            .http
            .get_json_with_status(&self.validator_url(address))
            .await?;
        parse_validator(status, payload)
    }

    async fn fetch_queue_position(&self, address: &str) -> Result<QueuePosition, TransportError> {
        let payload: Value = self.http.get_json(&self.queue_url(address)).await?;
        parse_queue(&payload)
    }
}
