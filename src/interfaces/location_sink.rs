//! Remote location delivery interface.

use async_trait::async_trait;

use crate::location::LocationRecord;

/// Errors raised by a remote location sink.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Bearer token was not accepted")]
    Unauthorized,

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Accepts location records for a driver over the network.
///
/// Delivery is all-or-nothing per record: success or an error.
#[async_trait]
pub trait LocationSink: Send + Sync {
    /// Deliver one record on behalf of the token's owner.
    async fn send(&self, record: &LocationRecord, token: &str) -> Result<(), DeliveryError>;

    /// Fetch the history the backend holds for the token's owner.
    async fn fetch_history(&self, token: &str) -> Result<Vec<LocationRecord>, DeliveryError>;
}
