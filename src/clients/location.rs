//! REST location sink.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ApiClient, ClientError};
use crate::interfaces::{DeliveryError, LocationSink};
use crate::location::LocationRecord;

/// Endpoint receiving single location records.
pub const LOCATION_TRACK_PATH: &str = "/api/location/track";
/// Endpoint returning the driver's stored history.
pub const LOCATION_HISTORY_PATH: &str = "/api/location/history";

/// History payloads come back either bare or wrapped in a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryResponse {
    Records(Vec<LocationRecord>),
    Page { results: Vec<LocationRecord> },
}

impl From<HistoryResponse> for Vec<LocationRecord> {
    fn from(response: HistoryResponse) -> Self {
        match response {
            HistoryResponse::Records(records) => records,
            HistoryResponse::Page { results } => results,
        }
    }
}

impl From<ClientError> for DeliveryError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Status { status: 401, .. } | ClientError::Status { status: 403, .. } => {
                DeliveryError::Unauthorized
            }
            ClientError::Status { status, body } => DeliveryError::Rejected {
                status,
                message: body,
            },
            ClientError::Http(e) if e.is_decode() => DeliveryError::Decode(e.to_string()),
            other => DeliveryError::Transport(other.to_string()),
        }
    }
}

/// Location sink backed by the driver REST API.
pub struct RestLocationSink {
    api: Arc<ApiClient>,
}

impl RestLocationSink {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LocationSink for RestLocationSink {
    async fn send(&self, record: &LocationRecord, token: &str) -> Result<(), DeliveryError> {
        self.api.post(LOCATION_TRACK_PATH, record, Some(token)).await?;
        debug!(timestamp = record.timestamp, "Location delivered");
        Ok(())
    }

    async fn fetch_history(&self, token: &str) -> Result<Vec<LocationRecord>, DeliveryError> {
        let response: HistoryResponse = self
            .api
            .get_json(LOCATION_HISTORY_PATH, Some(token))
            .await?;
        Ok(response.into())
    }
}
