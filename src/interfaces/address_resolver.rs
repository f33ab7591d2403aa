//! Reverse geocoding interface.

use std::time::Duration;

use async_trait::async_trait;

use crate::location::Address;

/// Errors raised while resolving an address.
#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("Geocoding lookup failed: {0}")]
    Lookup(String),

    #[error("Geocoding timed out after {0:?}")]
    Timeout(Duration),
}

/// Maps coordinates to a human-readable address, best effort.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Look up the address at a coordinate. `Ok(None)` means no match.
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Address>, GeocodingError>;
}
