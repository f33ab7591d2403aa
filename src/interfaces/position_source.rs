//! Position source interface (device location API).

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::location::{PositionSample, WatchOptions};

/// Result type for position source operations.
pub type Result<T> = std::result::Result<T, PositionError>;

/// Errors raised by a position source.
#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    #[error("Permission request failed: {0}")]
    Permission(String),

    #[error("Failed to register position watch: {0}")]
    Watch(String),

    #[error("Unknown watch handle: {0}")]
    UnknownWatch(WatchHandle),
}

/// Opaque handle identifying a registered watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(pub u64);

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// A registered watch: its handle plus the stream of emitted samples.
///
/// The stream ends once the source releases the watch.
#[derive(Debug)]
pub struct PositionWatch {
    pub handle: WatchHandle,
    pub samples: mpsc::Receiver<PositionSample>,
}

/// Interface to the device's positioning system.
///
/// Samples are emitted sequentially per watch, rate-limited by the
/// [`WatchOptions`] given at registration.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Ask for foreground location permission. Returns whether it was granted.
    async fn request_permission(&self) -> Result<bool>;

    /// Register a watch and start emitting samples.
    async fn watch_position(&self, options: &WatchOptions) -> Result<PositionWatch>;

    /// Release a previously registered watch.
    async fn unwatch(&self, handle: WatchHandle) -> Result<()>;
}
