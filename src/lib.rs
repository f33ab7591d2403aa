//! Roadlog - location tracking for truck drivers
//!
//! Samples device position, enriches it with an address, keeps a bounded
//! local history, and forwards every record to the driver backend with a
//! durable retry queue for deliveries that fail while offline.

pub mod auth;
pub mod clients;
pub mod config;
pub mod diagnostics;
pub mod interfaces;
pub mod location;
pub mod sources;
pub mod storage;
pub mod tracking;
pub mod utils;

pub use config::Config;
pub use location::{Address, LocationRecord, PositionSample, WatchOptions};
pub use storage::Storage;
pub use tracking::{RetryOutcome, TrackingEngine, TrackingError, TrackingStatus};
