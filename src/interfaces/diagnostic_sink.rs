//! Diagnostic reporting interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One reported failure with the operation it interrupted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEvent {
    pub id: Uuid,
    /// Operation that failed, e.g. `SET` or `sendLocation`.
    pub operation: String,
    /// Rendered error message.
    pub message: String,
    /// Free-form operation context (keys, record coordinates, ...).
    pub context: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl DiagnosticEvent {
    pub fn new(
        operation: impl Into<String>,
        error: &dyn std::error::Error,
        context: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation: operation.into(),
            message: error.to_string(),
            context,
            occurred_at: Utc::now(),
        }
    }
}

/// Optional sink for diagnostic events.
///
/// Reporting never fails from the caller's point of view; implementations
/// absorb their own errors.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn report(&self, event: DiagnosticEvent);
}
