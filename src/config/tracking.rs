//! Location tracking configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::location::{Accuracy, WatchOptions};

/// Shortest retry interval accepted; smaller values are raised to it.
pub const MIN_RETRY_INTERVAL_SECS: u64 = 1;

/// Location tracking configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Accuracy requested from the position source. Default: high.
    pub accuracy: Accuracy,
    /// Minimum time between samples in milliseconds. Default: 5000.
    pub min_interval_ms: u64,
    /// Minimum movement between samples in meters. Default: 10.
    pub min_distance_m: f64,
    /// Interval between background retry passes in seconds. Default: 300.
    /// Minimum: 1.
    pub retry_interval_secs: u64,
    /// Maximum entries kept in local history. Default: 100.
    pub history_limit: usize,
    /// Maximum entries kept in the failed-delivery queue. Default: 1000.
    /// Zero disables the cap.
    pub failed_queue_limit: usize,
    /// Upper bound on a reverse-geocoding lookup in milliseconds. Default: 5000.
    pub geocode_timeout_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            min_interval_ms: 5000,
            min_distance_m: 10.0,
            retry_interval_secs: 300,
            history_limit: 100,
            failed_queue_limit: 1000,
            geocode_timeout_ms: 5000,
        }
    }
}

impl TrackingConfig {
    /// Options handed to the position source when tracking starts.
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            accuracy: self.accuracy,
            min_interval_ms: self.min_interval_ms,
            min_distance_m: self.min_distance_m,
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs.max(MIN_RETRY_INTERVAL_SECS))
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_millis(self.geocode_timeout_ms)
    }

    /// The failed-queue cap, if any.
    pub fn failed_queue_cap(&self) -> Option<usize> {
        (self.failed_queue_limit > 0).then_some(self.failed_queue_limit)
    }
}
