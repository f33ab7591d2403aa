//! Retry utilities: backoff builders and retryable status classification.
//!
//! Uses `backon` for exponential backoff with jitter. Retries here only paper
//! over transient transport hiccups within a single delivery attempt; records
//! that still fail go to the failed-delivery queue instead.

use std::time::Duration;

use backon::ExponentialBuilder;
use reqwest::StatusCode;

/// Backoff for a single HTTP request against the remote API.
///
/// - Min delay: 200ms
/// - Max delay: 2s
/// - Max retries: 2
/// - Jitter enabled
pub fn transport_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(2)
        .with_jitter()
}

/// Determines if an HTTP status is worth retrying (rate limit or server error).
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
