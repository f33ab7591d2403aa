//! Retry reconciliation for the failed-delivery queue.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use super::engine::EngineInner;
use super::{RetryOutcome, RetrySkipReason};
use crate::interfaces::StorageError;
use crate::location::LocationRecord;
use crate::storage::{FAILED_LOCATIONS_KEY, LOCATION_HISTORY_KEY};

/// Holds the retry flag for one pass; clears it on drop.
struct RetryGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RetryGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RetryGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl EngineInner {
    pub(crate) async fn retry_failed_locations(&self) -> RetryOutcome {
        let Some(_guard) = RetryGuard::acquire(&self.is_retrying) else {
            debug!("Retry pass already running");
            return RetryOutcome::Skipped(RetrySkipReason::AlreadyRunning);
        };

        match self.reconcile().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Retry pass aborted");
                RetryOutcome::Aborted(e)
            }
        }
    }

    async fn reconcile(&self) -> Result<RetryOutcome, StorageError> {
        let queued = {
            let _lock = self.write_lock.lock().await;
            self.queued_during_retry.store(0, Ordering::SeqCst);
            self.storage
                .get_json::<Vec<LocationRecord>>(FAILED_LOCATIONS_KEY)
                .await?
                .unwrap_or_default()
        };

        if queued.is_empty() {
            return Ok(RetryOutcome::Skipped(RetrySkipReason::EmptyQueue));
        }

        let token = match self.tokens.token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!(queued = queued.len(), "No token, skipping retry pass");
                return Ok(RetryOutcome::Skipped(RetrySkipReason::NoToken));
            }
            Err(e) => {
                warn!(error = %e, "Token lookup failed, skipping retry pass");
                return Ok(RetryOutcome::Skipped(RetrySkipReason::NoToken));
            }
        };

        let mut succeeded = Vec::new();
        let mut still_failed = Vec::new();
        for record in queued {
            match self.sink.send(&record, &token).await {
                Ok(()) => succeeded.push(record),
                Err(e) => {
                    debug!(error = %e, timestamp = record.timestamp, "Retry delivery failed");
                    still_failed.push(record);
                }
            }
        }

        let _lock = self.write_lock.lock().await;

        // Records queued by the pipeline during this pass sit at the front.
        let current: Vec<LocationRecord> = self
            .storage
            .get_json(FAILED_LOCATIONS_KEY)
            .await?
            .unwrap_or_default();
        let arrivals = self
            .queued_during_retry
            .swap(0, Ordering::SeqCst)
            .min(current.len());

        let still_failed_count = still_failed.len();
        let mut queue: Vec<LocationRecord> = current.into_iter().take(arrivals).collect();
        queue.extend(still_failed);
        if let Some(cap) = self.config.failed_queue_cap() {
            queue.truncate(cap);
        }
        self.storage.set_json(FAILED_LOCATIONS_KEY, &queue).await?;

        if !succeeded.is_empty() {
            let history: Vec<LocationRecord> = self
                .storage
                .get_json(LOCATION_HISTORY_KEY)
                .await?
                .unwrap_or_default();
            let delivered_count = succeeded.len();
            let mut merged = succeeded;
            merged.extend(history);
            merged.truncate(self.config.history_limit);
            self.storage.set_json(LOCATION_HISTORY_KEY, &merged).await?;

            info!(
                delivered = delivered_count,
                still_failed = still_failed_count,
                arrivals,
                "Retry pass finished"
            );
            return Ok(RetryOutcome::Completed {
                delivered: delivered_count,
                still_failed: still_failed_count,
            });
        }

        info!(still_failed = still_failed_count, arrivals, "Retry pass finished, nothing delivered");
        Ok(RetryOutcome::Completed {
            delivered: 0,
            still_failed: still_failed_count,
        })
    }
}
