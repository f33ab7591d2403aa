//! Engine handle, builder and session lifecycle.

use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::{Arc, Weak};

use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::session::{spawn_sample_loop, TrackingSession};
use super::{RetryOutcome, TrackingError, TrackingStatus, UPDATE_CHANNEL_CAPACITY};
use crate::config::TrackingConfig;
use crate::interfaces::{
    AddressResolver, DiagnosticSink, LocationObserver, LocationSink, PositionSource, TokenProvider,
};
use crate::location::{LocationRecord, PositionSample};
use crate::storage::{Storage, FAILED_LOCATIONS_KEY, LOCATION_HISTORY_KEY};
use crate::utils::periodic::{spawn_periodic, PeriodicTaskHandle};

/// Shared engine state. Background tasks hold it weakly.
pub(crate) struct EngineInner {
    pub(crate) storage: Storage,
    pub(crate) positions: Arc<dyn PositionSource>,
    pub(crate) sink: Arc<dyn LocationSink>,
    pub(crate) tokens: Arc<dyn TokenProvider>,
    pub(crate) resolver: Option<Arc<dyn AddressResolver>>,
    pub(crate) diagnostics: Option<Arc<dyn DiagnosticSink>>,
    pub(crate) config: TrackingConfig,
    pub(crate) session: Mutex<Option<TrackingSession>>,
    /// Serializes read-modify-write of history and the failed queue.
    pub(crate) write_lock: Mutex<()>,
    pub(crate) is_retrying: AtomicBool,
    /// Records queued while a retry pass is running.
    pub(crate) queued_during_retry: AtomicUsize,
    pub(crate) updates: broadcast::Sender<LocationRecord>,
    pub(crate) last_record: RwLock<Option<LocationRecord>>,
}

/// Location tracking engine.
///
/// Cheap to clone; clones drive the same engine. Dropping the last clone
/// stops the retry timer and the sample loop.
#[derive(Clone)]
pub struct TrackingEngine {
    inner: Arc<EngineInner>,
}

/// Builder for [`TrackingEngine`].
pub struct TrackingEngineBuilder {
    storage: Storage,
    positions: Arc<dyn PositionSource>,
    sink: Arc<dyn LocationSink>,
    tokens: Arc<dyn TokenProvider>,
    resolver: Option<Arc<dyn AddressResolver>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
    config: TrackingConfig,
}

impl TrackingEngineBuilder {
    /// Enrich records with addresses. Without a resolver records carry none.
    pub fn address_resolver(mut self, resolver: Arc<dyn AddressResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Report delivery failures to `sink`.
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TrackingEngine {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        TrackingEngine {
            inner: Arc::new(EngineInner {
                storage: self.storage,
                positions: self.positions,
                sink: self.sink,
                tokens: self.tokens,
                resolver: self.resolver,
                diagnostics: self.diagnostics,
                config: self.config,
                session: Mutex::new(None),
                write_lock: Mutex::new(()),
                is_retrying: AtomicBool::new(false),
                queued_during_retry: AtomicUsize::new(0),
                updates,
                last_record: RwLock::new(None),
            }),
        }
    }
}

impl TrackingEngine {
    pub fn builder(
        storage: Storage,
        positions: Arc<dyn PositionSource>,
        sink: Arc<dyn LocationSink>,
        tokens: Arc<dyn TokenProvider>,
    ) -> TrackingEngineBuilder {
        TrackingEngineBuilder {
            storage,
            positions,
            sink,
            tokens,
            resolver: None,
            diagnostics: None,
            config: TrackingConfig::default(),
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.inner.config
    }

    /// Request permission, register a position watch and start the retry timer.
    ///
    /// If a session is already active and permission is granted again, the
    /// old session is released first. A denied permission leaves any active
    /// session untouched.
    pub async fn start_tracking<O>(&self, observer: O) -> Result<(), TrackingError>
    where
        O: LocationObserver + 'static,
    {
        let inner = &self.inner;

        if !inner.positions.request_permission().await? {
            warn!("Location permission denied");
            return Err(TrackingError::PermissionDenied);
        }

        let mut session = inner.session.lock().await;
        if let Some(previous) = session.take() {
            info!(watch = %previous.watch_handle, "Replacing active tracking session");
            let handle = previous.watch_handle;
            drop(previous.close());
            if let Err(e) = inner.positions.unwatch(handle).await {
                warn!(watch = %handle, error = %e, "Failed to release previous watch");
            }
        }

        let options = inner.config.watch_options();
        let watch = inner.positions.watch_position(&options).await?;
        let observer: Arc<dyn LocationObserver> = Arc::new(observer);
        let (stop_tx, stop_rx) = watch::channel(false);

        let sample_task = spawn_sample_loop(
            Arc::downgrade(inner),
            observer.clone(),
            watch.samples,
            stop_rx,
        );
        let retry_task = spawn_retry_timer(Arc::downgrade(inner), &inner.config);

        info!(
            watch = %watch.handle,
            min_interval_ms = options.min_interval_ms,
            min_distance_m = options.min_distance_m,
            "Tracking started"
        );

        *session = Some(TrackingSession {
            watch_handle: watch.handle,
            observer,
            stop: stop_tx,
            sample_task,
            retry_task,
        });
        Ok(())
    }

    /// Release the position watch and stop the retry timer. No-op when idle.
    ///
    /// Samples already emitted are still processed in the background.
    pub async fn stop_tracking(&self) -> Result<(), TrackingError> {
        self.end_session().await.map(drop)
    }

    /// Like [`stop_tracking`](Self::stop_tracking), but waits until samples
    /// already emitted have gone through the pipeline.
    pub async fn shutdown(&self) -> Result<(), TrackingError> {
        if let Some(sample_task) = self.end_session().await? {
            if let Err(e) = sample_task.await {
                warn!(error = %e, "Sample loop ended abnormally");
            }
        }
        Ok(())
    }

    async fn end_session(&self) -> Result<Option<JoinHandle<()>>, TrackingError> {
        let Some(session) = self.inner.session.lock().await.take() else {
            debug!("Stop requested while idle");
            return Ok(None);
        };

        let handle = session.watch_handle;
        let sample_task = session.close();
        self.inner.positions.unwatch(handle).await?;

        info!(watch = %handle, "Tracking stopped");
        Ok(Some(sample_task))
    }

    pub async fn is_tracking(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    /// Receive every record the pipeline produces from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LocationRecord> {
        self.inner.updates.subscribe()
    }

    /// Run one sample through the pipeline, as if the position source had
    /// emitted it. The active session's observer, if any, is notified.
    pub async fn process_sample(&self, sample: PositionSample) -> LocationRecord {
        let observer = self
            .inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|session| session.observer.clone());
        self.inner.run_pipeline(sample, observer.as_deref()).await
    }

    /// Re-send queued records once.
    pub async fn retry_failed_locations(&self) -> RetryOutcome {
        self.inner.retry_failed_locations().await
    }

    pub async fn status(&self) -> TrackingStatus {
        TrackingStatus {
            is_tracking: self.is_tracking().await,
            last_record: self.inner.last_record.read().await.clone(),
            failed_count: self.get_failed_locations().await.len(),
        }
    }

    /// History from the backend, falling back to local history on any failure.
    ///
    /// A successful fetch replaces local history.
    pub async fn get_location_history(&self) -> Vec<LocationRecord> {
        let inner = &self.inner;

        let token = match inner.tokens.token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No token, serving local history");
                return self.get_local_location_history().await;
            }
            Err(e) => {
                warn!(error = %e, "Token lookup failed, serving local history");
                return self.get_local_location_history().await;
            }
        };

        match inner.sink.fetch_history(&token).await {
            Ok(records) => {
                inner.replace_history(&records).await;
                records
            }
            Err(e) => {
                warn!(error = %e, "Remote history fetch failed, serving local history");
                self.get_local_location_history().await
            }
        }
    }

    /// Records waiting for delivery, newest first. Empty on storage errors.
    pub async fn get_failed_locations(&self) -> Vec<LocationRecord> {
        self.inner.read_list(FAILED_LOCATIONS_KEY).await
    }

    /// Locally persisted history, newest first. Empty on storage errors.
    pub async fn get_local_location_history(&self) -> Vec<LocationRecord> {
        self.inner.read_list(LOCATION_HISTORY_KEY).await
    }
}

fn spawn_retry_timer(engine: Weak<EngineInner>, config: &TrackingConfig) -> PeriodicTaskHandle {
    spawn_periodic("location-retry", config.retry_interval(), move || {
        let engine = engine.clone();
        async move {
            let Some(engine) = engine.upgrade() else {
                return false;
            };
            engine.retry_failed_locations().await;
            true
        }
    })
}

impl EngineInner {
    /// Read a record list, defaulting to empty on any storage error.
    pub(crate) async fn read_list(&self, key: &str) -> Vec<LocationRecord> {
        match self.storage.get_json(key).await {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                warn!(key = %key, error = %e, "Could not read stored locations");
                Vec::new()
            }
        }
    }

    async fn replace_history(&self, records: &[LocationRecord]) {
        let limit = records.len().min(self.config.history_limit);
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self
            .storage
            .set_json(LOCATION_HISTORY_KEY, &records[..limit])
            .await
        {
            warn!(error = %e, "Could not store fetched history");
        }
    }
}
