//! Live location observer interface.

use crate::location::LocationRecord;

/// Receives every record produced while tracking is active.
///
/// Called inline by the sample pipeline, so implementations should return
/// quickly. Any `Fn(&LocationRecord)` closure is an observer.
pub trait LocationObserver: Send + Sync {
    fn on_location(&self, record: &LocationRecord);
}

impl<F> LocationObserver for F
where
    F: Fn(&LocationRecord) + Send + Sync,
{
    fn on_location(&self, record: &LocationRecord) {
        self(record)
    }
}
