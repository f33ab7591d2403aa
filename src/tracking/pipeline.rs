//! Per-sample pipeline.

use std::sync::atomic::Ordering;

use serde_json::json;
use tracing::{debug, warn};

use super::engine::EngineInner;
use crate::interfaces::{DiagnosticEvent, GeocodingError, LocationObserver, StorageError};
use crate::location::{LocationRecord, PositionSample};
use crate::storage::{FAILED_LOCATIONS_KEY, LOCATION_HISTORY_KEY};

/// Operation name reported when remote delivery fails.
pub(crate) const SEND_LOCATION_OPERATION: &str = "sendLocation";

impl EngineInner {
    /// Turn a sample into a record and hand it to observers, history and the sink.
    ///
    /// Every step absorbs its own errors, so a failing collaborator never
    /// stops later samples.
    pub(crate) async fn run_pipeline(
        &self,
        sample: PositionSample,
        observer: Option<&dyn LocationObserver>,
    ) -> LocationRecord {
        let address = self.resolve_address(&sample).await;
        let record = LocationRecord::from_sample(&sample, address);
        debug!(
            latitude = record.latitude,
            longitude = record.longitude,
            timestamp = record.timestamp,
            has_address = record.formatted_address.is_some(),
            "Location sampled"
        );

        if let Some(observer) = observer {
            observer.on_location(&record);
        }
        // No subscribers is fine.
        let _ = self.updates.send(record.clone());
        *self.last_record.write().await = Some(record.clone());

        if let Err(e) = self.append_history(&record).await {
            warn!(error = %e, timestamp = record.timestamp, "Could not persist location to history");
        }

        self.deliver(&record).await;
        record
    }

    async fn resolve_address(&self, sample: &PositionSample) -> Option<String> {
        let resolver = self.resolver.as_ref()?;
        let window = self.config.geocode_timeout();

        let lookup = resolver.reverse_geocode(sample.latitude, sample.longitude);
        let result = match tokio::time::timeout(window, lookup).await {
            Ok(result) => result,
            Err(_) => Err(GeocodingError::Timeout(window)),
        };

        match result {
            Ok(address) => address.and_then(|a| a.formatted()),
            Err(e) => {
                debug!(error = %e, "Reverse geocoding failed, continuing without address");
                None
            }
        }
    }

    async fn append_history(&self, record: &LocationRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut history: Vec<LocationRecord> = self
            .storage
            .get_json(LOCATION_HISTORY_KEY)
            .await?
            .unwrap_or_default();
        history.insert(0, record.clone());
        history.truncate(self.config.history_limit);
        self.storage.set_json(LOCATION_HISTORY_KEY, &history).await
    }

    async fn deliver(&self, record: &LocationRecord) {
        let token = match self.tokens.token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No token, skipping delivery");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Token lookup failed, skipping delivery");
                return;
            }
        };

        let Err(e) = self.sink.send(record, &token).await else {
            debug!(timestamp = record.timestamp, "Location delivered");
            return;
        };

        warn!(error = %e, timestamp = record.timestamp, "Location delivery failed, queueing");
        if let Err(storage_error) = self.enqueue_failed(record).await {
            warn!(error = %storage_error, "Could not queue undelivered location");
        }

        if let Some(sink) = &self.diagnostics {
            let context = json!({
                "latitude": record.latitude,
                "longitude": record.longitude,
                "timestamp": record.timestamp,
            });
            sink.report(DiagnosticEvent::new(SEND_LOCATION_OPERATION, &e, context))
                .await;
        }
    }

    /// Prepend a record to the failed-delivery queue.
    async fn enqueue_failed(&self, record: &LocationRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut queue: Vec<LocationRecord> = self
            .storage
            .get_json(FAILED_LOCATIONS_KEY)
            .await?
            .unwrap_or_default();
        queue.insert(0, record.clone());

        if let Some(cap) = self.config.failed_queue_cap() {
            if queue.len() > cap {
                warn!(dropped = queue.len() - cap, cap, "Failed-delivery queue full, dropping oldest");
                queue.truncate(cap);
            }
        }

        self.storage.set_json(FAILED_LOCATIONS_KEY, &queue).await?;
        if self.is_retrying.load(Ordering::SeqCst) {
            self.queued_during_retry.fetch_add(1, Ordering::SeqCst);
        }
        debug!(queued = queue.len(), "Location queued for retry");
        Ok(())
    }
}
