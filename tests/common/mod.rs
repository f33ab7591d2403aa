//! Shared utilities for integration tests.
//!
//! Scriptable collaborators for driving the tracking engine: a position
//! source that counts watch registrations, a location sink whose results
//! and timing are scripted per call, a switchable token provider, address
//! resolvers, and a diagnostics recorder.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use roadlog::config::TrackingConfig;
use roadlog::interfaces::{
    AddressResolver, AuthError, DeliveryError, DiagnosticEvent, DiagnosticSink, GeocodingError,
    LocationSink, PositionError, PositionSource, PositionWatch, TokenProvider, WatchHandle,
};
use roadlog::location::{Address, LocationRecord, PositionSample, WatchOptions};
use roadlog::storage::MemoryKeyValueStore;
use roadlog::{Storage, TrackingEngine};

// =============================================================================
// Position source
// =============================================================================

/// Position source that forwards every emitted sample without throttling.
pub struct MockPositionSource {
    permission: AtomicBool,
    next_handle: AtomicU64,
    watch_calls: AtomicUsize,
    unwatch_calls: AtomicUsize,
    senders: Mutex<HashMap<WatchHandle, mpsc::Sender<PositionSample>>>,
    last_options: Mutex<Option<WatchOptions>>,
}

impl MockPositionSource {
    pub fn new(granted: bool) -> Self {
        Self {
            permission: AtomicBool::new(granted),
            next_handle: AtomicU64::new(1),
            watch_calls: AtomicUsize::new(0),
            unwatch_calls: AtomicUsize::new(0),
            senders: Mutex::new(HashMap::new()),
            last_options: Mutex::new(None),
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    pub fn unwatch_calls(&self) -> usize {
        self.unwatch_calls.load(Ordering::SeqCst)
    }

    pub fn active_watches(&self) -> usize {
        self.senders.lock().unwrap().len()
    }

    pub fn last_options(&self) -> Option<WatchOptions> {
        self.last_options.lock().unwrap().clone()
    }

    /// Emit a sample on every active watch.
    pub async fn emit(&self, sample: PositionSample) {
        let senders: Vec<_> = self.senders.lock().unwrap().values().cloned().collect();
        for sender in senders {
            sender.send(sample.clone()).await.unwrap();
        }
    }
}

#[async_trait]
impl PositionSource for MockPositionSource {
    async fn request_permission(&self) -> Result<bool, PositionError> {
        Ok(self.permission.load(Ordering::SeqCst))
    }

    async fn watch_position(&self, options: &WatchOptions) -> Result<PositionWatch, PositionError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());

        let handle = WatchHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let (sender, samples) = mpsc::channel(128);
        self.senders.lock().unwrap().insert(handle, sender);
        Ok(PositionWatch { handle, samples })
    }

    async fn unwatch(&self, handle: WatchHandle) -> Result<(), PositionError> {
        self.unwatch_calls.fetch_add(1, Ordering::SeqCst);
        match self.senders.lock().unwrap().remove(&handle) {
            Some(_) => Ok(()),
            None => Err(PositionError::UnknownWatch(handle)),
        }
    }
}

// =============================================================================
// Location sink
// =============================================================================

/// Location sink with per-call scripted results.
///
/// Results are taken from the script in call order; once it is empty every
/// call uses the default. A held call takes its result first, then waits
/// for [`release`](Self::release).
pub struct ScriptedSink {
    script: Mutex<VecDeque<bool>>,
    default_ok: AtomicBool,
    hold_next: AtomicBool,
    started: Notify,
    released: Notify,
    calls: AtomicUsize,
    sent: Mutex<Vec<LocationRecord>>,
    history: Mutex<Option<Vec<LocationRecord>>>,
}

impl Default for ScriptedSink {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_ok: AtomicBool::new(true),
            hold_next: AtomicBool::new(false),
            started: Notify::new(),
            released: Notify::new(),
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            history: Mutex::new(None),
        }
    }
}

impl ScriptedSink {
    pub fn set_default_ok(&self, ok: bool) {
        self.default_ok.store(ok, Ordering::SeqCst);
    }

    pub fn script(&self, results: &[bool]) {
        self.script.lock().unwrap().extend(results.iter().copied());
    }

    /// Make the next `send` wait until released.
    pub fn hold_next(&self) {
        self.hold_next.store(true, Ordering::SeqCst);
    }

    /// Wait until a held call has started.
    pub async fn wait_held(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    /// History returned by `fetch_history`; `None` makes it fail.
    pub fn set_history(&self, history: Option<Vec<LocationRecord>>) {
        *self.history.lock().unwrap() = history;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Records accepted so far, in delivery order.
    pub fn sent(&self) -> Vec<LocationRecord> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocationSink for ScriptedSink {
    async fn send(&self, record: &LocationRecord, token: &str) -> Result<(), DeliveryError> {
        assert!(!token.is_empty(), "sink must never be called without a token");
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.script.lock().unwrap().pop_front();
        let ok = scripted.unwrap_or_else(|| self.default_ok.load(Ordering::SeqCst));

        if self.hold_next.swap(false, Ordering::SeqCst) {
            self.started.notify_one();
            self.released.notified().await;
        }

        if ok {
            self.sent.lock().unwrap().push(record.clone());
            Ok(())
        } else {
            Err(DeliveryError::Transport("network unreachable".to_string()))
        }
    }

    async fn fetch_history(&self, _token: &str) -> Result<Vec<LocationRecord>, DeliveryError> {
        self.history
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| DeliveryError::Rejected {
                status: 500,
                message: "internal error".to_string(),
            })
    }
}

// =============================================================================
// Token provider
// =============================================================================

pub struct MockTokenProvider {
    token: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MockTokenProvider {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: Mutex::new(token.map(str::to_string)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_token(&self, token: Option<&str>) {
        *self.token.lock().unwrap() = token.map(str::to_string);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn token(&self) -> Result<Option<String>, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.lock().unwrap().clone())
    }
}

// =============================================================================
// Address resolvers
// =============================================================================

pub struct FixedResolver(pub Address);

#[async_trait]
impl AddressResolver for FixedResolver {
    async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> Result<Option<Address>, GeocodingError> {
        Ok(Some(self.0.clone()))
    }
}

pub struct FailingResolver;

#[async_trait]
impl AddressResolver for FailingResolver {
    async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> Result<Option<Address>, GeocodingError> {
        Err(GeocodingError::Lookup("geocoder unavailable".to_string()))
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

#[derive(Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    pub fn operations(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.operation.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiagnosticSink for RecordingDiagnostics {
    async fn report(&self, event: DiagnosticEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// =============================================================================
// Engine fixture
// =============================================================================

/// Engine wired to mocks, with handles to each collaborator.
pub struct Fixture {
    pub engine: TrackingEngine,
    pub source: Arc<MockPositionSource>,
    pub sink: Arc<ScriptedSink>,
    pub tokens: Arc<MockTokenProvider>,
    pub backend: Arc<MemoryKeyValueStore>,
    pub storage: Storage,
    pub diagnostics: Arc<RecordingDiagnostics>,
}

pub struct FixtureBuilder {
    granted: bool,
    token: Option<&'static str>,
    resolver: Option<Arc<dyn AddressResolver>>,
    config: TrackingConfig,
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self {
            granted: true,
            token: Some("test-token"),
            resolver: None,
            config: TrackingConfig::default(),
        }
    }
}

impl FixtureBuilder {
    pub fn permission(mut self, granted: bool) -> Self {
        self.granted = granted;
        self
    }

    pub fn token(mut self, token: Option<&'static str>) -> Self {
        self.token = token;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn AddressResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Fixture {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let storage = Storage::new(backend.clone()).with_diagnostics(diagnostics.clone());
        let source = Arc::new(MockPositionSource::new(self.granted));
        let sink = Arc::new(ScriptedSink::default());
        let tokens = Arc::new(MockTokenProvider::new(self.token));

        let mut builder = TrackingEngine::builder(
            storage.clone(),
            source.clone(),
            sink.clone(),
            tokens.clone(),
        )
        .config(self.config)
        .diagnostics(diagnostics.clone());
        if let Some(resolver) = self.resolver {
            builder = builder.address_resolver(resolver);
        }

        Fixture {
            engine: builder.build(),
            source,
            sink,
            tokens,
            backend,
            storage,
            diagnostics,
        }
    }
}

pub fn fixture() -> FixtureBuilder {
    FixtureBuilder::default()
}

/// Sample at a distinct position for timestamp `ts`.
pub fn sample(ts: i64) -> PositionSample {
    PositionSample::new(40.0 + ts as f64 * 0.0001, -74.0, ts)
}

pub fn record(ts: i64) -> LocationRecord {
    LocationRecord::from_sample(&sample(ts), None)
}

pub fn timestamps(records: &[LocationRecord]) -> Vec<i64> {
    records.iter().map(|r| r.timestamp).collect()
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
