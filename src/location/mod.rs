//! Location domain types.
//!
//! A [`PositionSample`] is the raw reading emitted by a position source.
//! The tracking engine turns each sample into an immutable [`LocationRecord`],
//! optionally enriched with a formatted address, before handing it to
//! persistence and delivery.

mod geo;

pub use geo::{haversine_distance_m, EARTH_RADIUS_M};

use serde::{Deserialize, Serialize};

/// Requested positioning accuracy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    Low,
    Balanced,
    #[default]
    High,
}

/// Options passed to a position source when registering a watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    /// Minimum time between two emitted samples.
    pub min_interval_ms: u64,
    /// Minimum movement between two emitted samples.
    pub min_distance_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            min_interval_ms: 5000,
            min_distance_m: 10.0,
        }
    }
}

/// One raw reading from a position source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            accuracy: None,
            altitude_accuracy: None,
            heading: None,
        }
    }
}

/// Result of a reverse-geocoding lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl Address {
    /// Single-line form: street, city and region separated by spaces.
    ///
    /// Blank parts are skipped. Returns `None` when nothing is left.
    pub fn formatted(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.street, &self.city, &self.region]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// One observed position, as persisted and delivered.
///
/// Records are built once per sample and never mutated after they leave
/// the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch milliseconds of the observation.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
}

impl LocationRecord {
    /// Build a record from a sample and an optional resolved address.
    pub fn from_sample(sample: &PositionSample, formatted_address: Option<String>) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            timestamp: sample.timestamp,
            accuracy: sample.accuracy,
            altitude_accuracy: sample.altitude_accuracy,
            heading: sample.heading,
            formatted_address,
        }
    }
}
