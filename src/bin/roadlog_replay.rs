//! roadlog-replay: feed recorded samples through a full tracking engine
//!
//! Reads a JSON-lines file of position samples and plays them through the
//! same stack the mobile shell uses: configured local storage, the REST
//! location sink, and the token stored by a previous sign-in. Samples are
//! throttled by the configured watch options exactly as live samples are.
//!
//! ## Usage
//! ```text
//! roadlog-replay <samples.jsonl>
//! ```
//!
//! ## Configuration
//! - ROADLOG_CONFIG: Path to a YAML config file (optional)
//! - ROADLOG__API__BASE_URL etc.: Per-key overrides
//! - ROADLOG_LOG: Log filter (default: info)

use std::sync::Arc;

use tracing::{info, warn};

use roadlog::auth::AuthSession;
use roadlog::clients::{ApiClient, AuthApi, RestErrorReporter, RestLocationSink};
use roadlog::diagnostics::{ErrorTracker, TracingDiagnostics};
use roadlog::interfaces::DiagnosticSink;
use roadlog::sources::ChannelPositionSource;
use roadlog::storage::init_storage;
use roadlog::utils::bootstrap::init_tracing;
use roadlog::{Config, LocationRecord, PositionSample, Storage, TrackingEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let Some(path) = std::env::args().nth(1) else {
        return Err("usage: roadlog-replay <samples.jsonl>".into());
    };

    let config = Config::load(None)?;
    let backend = init_storage(&config.storage).await?;
    let api = Arc::new(ApiClient::new(&config.api)?);

    let tracker = config.diagnostics.enabled.then(|| {
        Arc::new(ErrorTracker::new(
            Arc::new(RestErrorReporter::new(api.clone())),
            Storage::new(backend.clone()),
            config.diagnostics.clone(),
        ))
    });
    let diagnostics: Arc<dyn DiagnosticSink> = match &tracker {
        Some(tracker) => {
            tracker.start_retry_task().await;
            tracker.clone() as Arc<dyn DiagnosticSink>
        }
        None => Arc::new(TracingDiagnostics),
    };

    let storage = Storage::new(backend).with_diagnostics(diagnostics.clone());
    let session = Arc::new(AuthSession::new(
        Arc::new(AuthApi::new(api.clone())),
        storage.clone(),
    ));

    let contents = tokio::fs::read_to_string(&path).await?;
    let samples: Vec<PositionSample> = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str(line) {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping malformed sample");
                None
            }
        })
        .collect();

    let source = Arc::new(ChannelPositionSource::new(true).with_capacity(samples.len()));
    let engine = TrackingEngine::builder(
        storage,
        source.clone(),
        Arc::new(RestLocationSink::new(api)),
        session,
    )
    .config(config.tracking.clone())
    .diagnostics(diagnostics)
    .build();

    engine
        .start_tracking(|record: &LocationRecord| {
            info!(
                latitude = record.latitude,
                longitude = record.longitude,
                timestamp = record.timestamp,
                "Location recorded"
            );
        })
        .await?;

    let mut accepted = 0;
    for sample in &samples {
        accepted += source.publish(sample.clone()).await;
    }
    engine.shutdown().await?;

    let outcome = engine.retry_failed_locations().await;
    let status = engine.status().await;

    if let Some(tracker) = &tracker {
        tracker.stop_retry_task().await;
    }

    info!(
        read = samples.len(),
        accepted,
        history = engine.get_local_location_history().await.len(),
        failed = status.failed_count,
        retry = ?outcome,
        "Replay finished"
    );
    Ok(())
}
