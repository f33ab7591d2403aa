//! Error tracker with local retry queue.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{ErrorReport, ErrorReporter, UserContext};
use crate::config::DiagnosticsConfig;
use crate::interfaces::{DiagnosticEvent, DiagnosticSink};
use crate::storage::{self, Storage, FAILED_ERRORS_KEY};
use crate::utils::periodic::{spawn_periodic, PeriodicTaskHandle};

/// Result of one pass over the stored reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorRetrySummary {
    pub delivered: usize,
    pub requeued: usize,
    pub dropped: usize,
}

/// Forwards diagnostic events to an [`ErrorReporter`].
///
/// Reports that cannot be delivered are appended to the `failedErrors` queue
/// (oldest first, newest `max_stored` kept). Each retry pass re-sends them
/// in order and drops a report once it has failed `max_retries` retries.
///
/// The tracker's storage must not report back into the tracker.
pub struct ErrorTracker {
    reporter: Arc<dyn ErrorReporter>,
    storage: Storage,
    config: DiagnosticsConfig,
    user: RwLock<Option<UserContext>>,
    queue_lock: Mutex<()>,
    retry_task: Mutex<Option<PeriodicTaskHandle>>,
}

impl ErrorTracker {
    pub fn new(reporter: Arc<dyn ErrorReporter>, storage: Storage, config: DiagnosticsConfig) -> Self {
        Self {
            reporter,
            storage,
            config,
            user: RwLock::new(None),
            queue_lock: Mutex::new(()),
            retry_task: Mutex::new(None),
        }
    }

    pub async fn set_user_context(&self, id: impl Into<String>, email: impl Into<String>) {
        *self.user.write().await = Some(UserContext {
            id: id.into(),
            email: email.into(),
        });
    }

    pub async fn clear_user_context(&self) {
        *self.user.write().await = None;
    }

    pub async fn user_context(&self) -> Option<UserContext> {
        self.user.read().await.clone()
    }

    /// Send a report, queueing it locally when delivery fails.
    pub async fn track(&self, event: DiagnosticEvent) {
        let report = ErrorReport::from_event(event, self.user_context().await);

        match self.reporter.log_error(&report).await {
            Ok(()) => debug!(report_id = %report.id, "Error report delivered"),
            Err(e) => {
                debug!(report_id = %report.id, error = %e, "Error report queued");
                let _guard = self.queue_lock.lock().await;
                match self.load_queue().await {
                    Ok(mut queued) => {
                        queued.push(report);
                        self.save_queue(queued).await;
                    }
                    Err(e) => {
                        warn!(report_id = %report.id, error = %e, "Could not read queued error reports, report not stored");
                    }
                }
            }
        }
    }

    /// Reports waiting for delivery, oldest first.
    pub async fn failed_reports(&self) -> Vec<ErrorReport> {
        self.load_queue().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read queued error reports");
            Vec::new()
        })
    }

    /// Re-send every stored report once.
    pub async fn retry_failed_errors(&self) -> ErrorRetrySummary {
        let _guard = self.queue_lock.lock().await;
        let queued = match self.load_queue().await {
            Ok(queued) => queued,
            Err(e) => {
                warn!(error = %e, "Could not read queued error reports, skipping retry pass");
                return ErrorRetrySummary::default();
            }
        };
        if queued.is_empty() {
            return ErrorRetrySummary::default();
        }

        let mut summary = ErrorRetrySummary::default();
        let mut still_failed = Vec::new();

        for mut report in queued {
            match self.reporter.log_error(&report).await {
                Ok(()) => summary.delivered += 1,
                Err(_) if report.retry_count < self.config.max_retries => {
                    report.retry_count += 1;
                    summary.requeued += 1;
                    still_failed.push(report);
                }
                Err(e) => {
                    warn!(report_id = %report.id, error = %e, "Dropping error report after max retries");
                    summary.dropped += 1;
                }
            }
        }

        self.save_queue(still_failed).await;
        info!(
            delivered = summary.delivered,
            requeued = summary.requeued,
            dropped = summary.dropped,
            "Error report retry pass finished"
        );
        summary
    }

    /// Start (or restart) the periodic retry pass.
    pub async fn start_retry_task(self: &Arc<Self>) {
        let tracker: Weak<Self> = Arc::downgrade(self);
        let handle = spawn_periodic("error-retry", self.config.retry_interval(), move || {
            let tracker = tracker.clone();
            async move {
                match tracker.upgrade() {
                    Some(tracker) => {
                        tracker.retry_failed_errors().await;
                        true
                    }
                    None => false,
                }
            }
        });

        // Replacing the handle drops, and thereby stops, any previous task.
        *self.retry_task.lock().await = Some(handle);
    }

    pub async fn stop_retry_task(&self) {
        if let Some(handle) = self.retry_task.lock().await.take() {
            handle.stop();
        }
    }

    async fn load_queue(&self) -> storage::Result<Vec<ErrorReport>> {
        Ok(self
            .storage
            .get_json(FAILED_ERRORS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save_queue(&self, mut queued: Vec<ErrorReport>) {
        let max = self.config.max_stored;
        if queued.len() > max {
            queued.drain(..queued.len() - max);
        }
        if let Err(e) = self.storage.set_json(FAILED_ERRORS_KEY, &queued).await {
            warn!(error = %e, "Could not persist queued error reports");
        }
    }
}

#[async_trait]
impl DiagnosticSink for ErrorTracker {
    async fn report(&self, event: DiagnosticEvent) {
        self.track(event).await;
    }
}
