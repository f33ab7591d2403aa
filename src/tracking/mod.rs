//! Location tracking engine.
//!
//! The engine is either idle or running one tracking session. While a
//! session is active, every sample emitted by the position source goes
//! through the pipeline:
//!
//! 1. reverse geocode (best effort, bounded by a timeout)
//! 2. notify the session observer and stream subscribers
//! 3. prepend to local history, capped at `history_limit`
//! 4. deliver to the remote sink when a token is available, queueing the
//!    record in the failed-delivery queue if delivery errors
//!
//! A periodic task owned by the session re-sends queued records. All
//! read-modify-write sequences on history and the queue are serialized
//! inside the engine, and a retry pass keeps records queued while it was
//! running.

use crate::interfaces::{PositionError, StorageError};
use crate::location::LocationRecord;

mod engine;
mod pipeline;
mod retry;
mod session;

pub use engine::{TrackingEngine, TrackingEngineBuilder};

/// Capacity of the broadcast channel behind [`TrackingEngine::subscribe`].
pub const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Errors returned by the engine's public state transitions.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Location permission not granted")]
    PermissionDenied,

    #[error("Position source error: {0}")]
    Position(#[from] PositionError),
}

/// Snapshot of the engine for a UI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingStatus {
    pub is_tracking: bool,
    pub last_record: Option<LocationRecord>,
    pub failed_count: usize,
}

/// Why a retry pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrySkipReason {
    /// Another pass holds the retry guard.
    AlreadyRunning,
    EmptyQueue,
    NoToken,
}

/// Result of one retry pass over the failed-delivery queue.
#[derive(Debug)]
pub enum RetryOutcome {
    Skipped(RetrySkipReason),
    Completed { delivered: usize, still_failed: usize },
    /// A storage failure ended the pass early.
    Aborted(StorageError),
}

impl RetryOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RetryOutcome::Completed { .. })
    }
}
