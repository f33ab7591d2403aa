//! Periodic background tasks with explicit cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

/// Handle to a running periodic task.
///
/// Dropping the handle stops the task, so a replaced owner never leaves a
/// timer behind.
#[derive(Debug)]
pub struct PeriodicTaskHandle {
    name: &'static str,
    cancel: watch::Sender<bool>,
}

impl PeriodicTaskHandle {
    /// Signal the task to stop. A tick already in progress runs to completion.
    pub fn stop(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the task loop has exited.
    pub fn is_finished(&self) -> bool {
        self.cancel.is_closed()
    }
}

impl Drop for PeriodicTaskHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn a task that runs `tick` every `interval`, first after one full interval.
///
/// The loop ends when the handle is stopped or dropped, or when `tick`
/// returns `false`.
pub fn spawn_periodic<F, Fut>(name: &'static str, interval: Duration, tick: F) -> PeriodicTaskHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        info!(task = name, interval_secs = interval.as_secs(), "Periodic task started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if !tick().await {
                        debug!(task = name, "Periodic task owner gone");
                        break;
                    }
                }
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!(task = name, "Periodic task stopped");
    });

    PeriodicTaskHandle {
        name,
        cancel: cancel_tx,
    }
}
