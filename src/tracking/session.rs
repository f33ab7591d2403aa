//! Active tracking session.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::engine::EngineInner;
use crate::interfaces::{LocationObserver, WatchHandle};
use crate::location::PositionSample;
use crate::utils::periodic::PeriodicTaskHandle;

/// State owned by the engine while tracking is active. Never persisted.
pub(crate) struct TrackingSession {
    pub(crate) watch_handle: WatchHandle,
    pub(crate) observer: Arc<dyn LocationObserver>,
    pub(crate) stop: watch::Sender<bool>,
    pub(crate) sample_task: JoinHandle<()>,
    pub(crate) retry_task: PeriodicTaskHandle,
}

impl TrackingSession {
    /// Stop the retry timer and the sample loop. Samples already received
    /// from the source are still processed.
    pub(crate) fn close(self) -> JoinHandle<()> {
        self.retry_task.stop();
        let _ = self.stop.send(true);
        self.sample_task
    }
}

/// Feed samples from a watch into the pipeline until stopped.
pub(crate) fn spawn_sample_loop(
    engine: Weak<EngineInner>,
    observer: Arc<dyn LocationObserver>,
    mut samples: mpsc::Receiver<PositionSample>,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                sample = samples.recv() => {
                    let Some(sample) = sample else {
                        debug!("Position stream ended");
                        return;
                    };
                    let Some(engine) = engine.upgrade() else {
                        return;
                    };
                    engine.run_pipeline(sample, Some(observer.as_ref())).await;
                }
            }
        }

        // Drain samples the source emitted before the session ended.
        while let Ok(sample) = samples.try_recv() {
            let Some(engine) = engine.upgrade() else {
                return;
            };
            engine.run_pipeline(sample, Some(observer.as_ref())).await;
        }
        debug!("Sample loop stopped");
    })
}
