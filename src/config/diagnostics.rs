//! Error tracking configuration.

use std::time::Duration;

use serde::Deserialize;

use super::tracking::MIN_RETRY_INTERVAL_SECS;

/// Error tracking configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Forward diagnostic events to the remote error log. Default: false.
    pub enabled: bool,
    /// Delivery attempts for a failed report before it is dropped. Default: 3.
    pub max_retries: u32,
    /// Maximum failed reports kept locally. Default: 100.
    pub max_stored: usize,
    /// Interval between retry passes in seconds. Default: 300. Minimum: 1.
    pub retry_interval_secs: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: 3,
            max_stored: 100,
            retry_interval_secs: 300,
        }
    }
}

impl DiagnosticsConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs.max(MIN_RETRY_INTERVAL_SECS))
    }
}
