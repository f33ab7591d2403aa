//! Abstract interfaces for roadlog collaborators.
//!
//! These traits define the contracts for:
//! - Key-value persistence (durable on-device store)
//! - Position sampling (OS location API)
//! - Reverse geocoding (address lookup)
//! - Remote location delivery (REST backend)
//! - Bearer token supply (auth session)
//! - Diagnostic reporting (telemetry)
//! - Live location observers (UI layer)

pub mod address_resolver;
pub mod diagnostic_sink;
pub mod key_value_store;
pub mod location_sink;
pub mod observer;
pub mod position_source;
pub mod token_provider;

pub use address_resolver::{AddressResolver, GeocodingError};
pub use diagnostic_sink::{DiagnosticEvent, DiagnosticSink};
pub use key_value_store::{KeyValueStore, StorageError};
pub use location_sink::{DeliveryError, LocationSink};
pub use observer::LocationObserver;
pub use position_source::{PositionError, PositionSource, PositionWatch, WatchHandle};
pub use token_provider::{AuthError, TokenProvider};
