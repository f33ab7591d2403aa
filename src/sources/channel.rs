//! Host-fed position source.
//!
//! The embedding host (platform location callback, replay file, test) pushes
//! samples with [`ChannelPositionSource::publish`]. Each registered watch
//! applies its own throttling: a sample is forwarded only when at least
//! `min_interval_ms` has passed since the last forwarded sample (by sample
//! timestamp) and the position moved at least `min_distance_m`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::interfaces::position_source::Result;
use crate::interfaces::{PositionError, PositionSource, PositionWatch, WatchHandle};
use crate::location::{haversine_distance_m, PositionSample, WatchOptions};

/// Buffered samples per watch before new ones are dropped.
pub const DEFAULT_WATCH_CAPACITY: usize = 64;

struct Watcher {
    options: WatchOptions,
    sender: mpsc::Sender<PositionSample>,
    last_emitted: Option<PositionSample>,
}

impl Watcher {
    fn accepts(&self, sample: &PositionSample) -> bool {
        let Some(last) = &self.last_emitted else {
            return true;
        };

        let elapsed_ms = sample.timestamp.saturating_sub(last.timestamp);
        let min_interval_ms = i64::try_from(self.options.min_interval_ms).unwrap_or(i64::MAX);
        if elapsed_ms < min_interval_ms {
            return false;
        }

        let moved = haversine_distance_m(
            last.latitude,
            last.longitude,
            sample.latitude,
            sample.longitude,
        );
        moved >= self.options.min_distance_m
    }
}

/// Position source driven by explicit [`publish`](Self::publish) calls.
pub struct ChannelPositionSource {
    permission: AtomicBool,
    next_handle: AtomicU64,
    capacity: usize,
    watchers: Mutex<HashMap<WatchHandle, Watcher>>,
}

impl Default for ChannelPositionSource {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ChannelPositionSource {
    /// Create a source that answers permission requests with `granted`.
    pub fn new(granted: bool) -> Self {
        Self {
            permission: AtomicBool::new(granted),
            next_handle: AtomicU64::new(1),
            capacity: DEFAULT_WATCH_CAPACITY,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    /// Number of live watches.
    pub async fn watch_count(&self) -> usize {
        self.watchers.lock().await.len()
    }

    /// Offer a sample to every watch. Returns how many watches received it.
    pub async fn publish(&self, sample: PositionSample) -> usize {
        let mut watchers = self.watchers.lock().await;
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (handle, watcher) in watchers.iter_mut() {
            if !watcher.accepts(&sample) {
                continue;
            }

            match watcher.sender.try_send(sample.clone()) {
                Ok(()) => {
                    watcher.last_emitted = Some(sample.clone());
                    delivered += 1;
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(watch = %handle, "Watch buffer full, dropping sample");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*handle),
            }
        }

        for handle in closed {
            debug!(watch = %handle, "Receiver gone, releasing watch");
            watchers.remove(&handle);
        }

        delivered
    }
}

#[async_trait]
impl PositionSource for ChannelPositionSource {
    async fn request_permission(&self) -> Result<bool> {
        Ok(self.permission.load(Ordering::SeqCst))
    }

    async fn watch_position(&self, options: &WatchOptions) -> Result<PositionWatch> {
        if !self.permission.load(Ordering::SeqCst) {
            return Err(PositionError::Watch("location permission not granted".to_string()));
        }

        let handle = WatchHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let (sender, samples) = mpsc::channel(self.capacity);

        self.watchers.lock().await.insert(
            handle,
            Watcher {
                options: options.clone(),
                sender,
                last_emitted: None,
            },
        );

        info!(watch = %handle, min_interval_ms = options.min_interval_ms, "Position watch registered");
        Ok(PositionWatch { handle, samples })
    }

    async fn unwatch(&self, handle: WatchHandle) -> Result<()> {
        match self.watchers.lock().await.remove(&handle) {
            Some(_) => {
                info!(watch = %handle, "Position watch released");
                Ok(())
            }
            None => Err(PositionError::UnknownWatch(handle)),
        }
    }
}
