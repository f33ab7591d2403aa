//! Diagnostic sinks and remote error tracking.
//!
//! [`TracingDiagnostics`] only logs. [`ErrorTracker`] forwards events to the
//! remote error log and keeps undeliverable reports in local storage for a
//! periodic retry pass.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::clients::ClientError;
use crate::interfaces::{DiagnosticEvent, DiagnosticSink};

mod tracker;

pub use tracker::{ErrorRetrySummary, ErrorTracker};

/// Identity attached to every report while a user is signed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub name: String,
    pub message: String,
}

/// Wire format of a report sent to the remote error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub id: Uuid,
    pub error: ErrorDetails,
    pub context: serde_json::Value,
    #[serde(default)]
    pub user: Option<UserContext>,
    #[serde(default)]
    pub retry_count: u32,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorReport {
    /// Build a report from a diagnostic event, tagging it with platform info.
    pub fn from_event(event: DiagnosticEvent, user: Option<UserContext>) -> Self {
        let mut context = match event.context {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("detail".to_string(), other);
                map
            }
        };
        context.insert("platform".to_string(), std::env::consts::OS.into());
        context.insert("version".to_string(), env!("CARGO_PKG_VERSION").into());

        Self {
            id: event.id,
            error: ErrorDetails {
                name: event.operation,
                message: event.message,
            },
            context: serde_json::Value::Object(context),
            user,
            retry_count: 0,
            occurred_at: event.occurred_at,
        }
    }
}

/// Destination for error reports.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn log_error(&self, report: &ErrorReport) -> Result<(), ClientError>;
}

/// Sink that writes events to the log and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

#[async_trait]
impl DiagnosticSink for TracingDiagnostics {
    async fn report(&self, event: DiagnosticEvent) {
        warn!(
            event_id = %event.id,
            operation = %event.operation,
            context = %event.context,
            "{}",
            event.message
        );
    }
}
