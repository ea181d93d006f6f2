//! Integration tests for [`StreamConnector`].
//!
//! The backend, the surface and the engine are replaced by in-memory
//! fakes that count what the connector did to them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use leftwatch_client::{ApiError, EventSource};
use leftwatch_core::types::EventId;
use leftwatch_core::{Event, EventStatus, StatusFilter};
use leftwatch_stream::playlist::MediaSegment;
use leftwatch_stream::{
    ConnectError, ConnectionState, EngineConfig, EngineError, EngineFactory, PlaybackPath,
    PlaybackSurface, StreamConnector, StreamEngine,
};
use tokio::sync::{watch, Notify};

const LOCATOR: &str = "https://host/stream.m3u8";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeSource {
    /// Queued locator responses; empty means "return LOCATOR".
    locators: Mutex<VecDeque<Result<String, ApiError>>>,
    locator_calls: AtomicUsize,
}

impl FakeSource {
    fn failing_once() -> Self {
        let source = Self::default();
        source.locators.lock().unwrap().push_back(Err(ApiError::Http {
            status: 502,
            body: "bad gateway".into(),
        }));
        source
    }
}

#[async_trait]
impl EventSource for FakeSource {
    async fn list_events(&self, _filter: StatusFilter) -> Result<Vec<Event>, ApiError> {
        Ok(Vec::new())
    }

    async fn get_event(&self, id: EventId) -> Result<Event, ApiError> {
        Err(ApiError::Http {
            status: 404,
            body: format!("event {id} not found"),
        })
    }

    async fn get_stream_locator(&self) -> Result<String, ApiError> {
        self.locator_calls.fetch_add(1, Ordering::SeqCst);
        self.locators
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(LOCATOR.to_string()))
    }

    async fn set_event_status(
        &self,
        id: EventId,
        _status: EventStatus,
    ) -> Result<Event, ApiError> {
        Err(ApiError::Http {
            status: 404,
            body: format!("event {id} not found"),
        })
    }
}

#[derive(Default)]
struct FakeSurface {
    native: bool,
    sources: Mutex<Vec<String>>,
    clears: AtomicUsize,
    /// Shared with the factory to record teardown order.
    teardown: Arc<Mutex<Vec<&'static str>>>,
}

impl PlaybackSurface for FakeSurface {
    fn can_play_type(&self, _mime: &str) -> bool {
        self.native
    }

    fn set_source(&self, url: &str) {
        self.sources.lock().unwrap().push(url.to_string());
    }

    fn clear_source(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.teardown.lock().unwrap().push("clear");
    }

    fn push_segment(&self, _segment: &MediaSegment) {}
}

#[derive(Default)]
struct FakeFactory {
    supported: bool,
    fail_attach: bool,
    /// When set, `attach` waits for a notification before returning.
    attach_gate: Option<Arc<Notify>>,
    created: AtomicUsize,
    destroyed: Arc<AtomicUsize>,
    configs: Mutex<Vec<EngineConfig>>,
    loaded: Arc<Mutex<Vec<String>>>,
    failure_senders: Mutex<Vec<watch::Sender<Option<EngineError>>>>,
    teardown: Arc<Mutex<Vec<&'static str>>>,
}

impl EngineFactory for FakeFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, config: EngineConfig) -> Result<Box<dyn StreamEngine>, EngineError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(config);
        let (failure_tx, failures) = watch::channel(None);
        self.failure_senders.lock().unwrap().push(failure_tx);
        Ok(Box::new(FakeEngine {
            fail_attach: self.fail_attach,
            attach_gate: self.attach_gate.clone(),
            destroyed: Arc::clone(&self.destroyed),
            loaded: Arc::clone(&self.loaded),
            teardown: Arc::clone(&self.teardown),
            failures,
            is_destroyed: false,
        }))
    }
}

struct FakeEngine {
    fail_attach: bool,
    attach_gate: Option<Arc<Notify>>,
    destroyed: Arc<AtomicUsize>,
    loaded: Arc<Mutex<Vec<String>>>,
    teardown: Arc<Mutex<Vec<&'static str>>>,
    failures: watch::Receiver<Option<EngineError>>,
    is_destroyed: bool,
}

#[async_trait]
impl StreamEngine for FakeEngine {
    async fn load_source(&mut self, url: &str) -> Result<(), EngineError> {
        self.loaded.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn attach(&mut self, _surface: Arc<dyn PlaybackSurface>) -> Result<(), EngineError> {
        if let Some(gate) = &self.attach_gate {
            gate.notified().await;
        }
        if self.fail_attach {
            return Err(EngineError::Fetch("connection refused".into()));
        }
        Ok(())
    }

    fn failures(&self) -> watch::Receiver<Option<EngineError>> {
        self.failures.clone()
    }

    fn destroy(&mut self) {
        if !self.is_destroyed {
            self.is_destroyed = true;
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            self.teardown.lock().unwrap().push("destroy");
        }
    }
}

fn connector(
    source: FakeSource,
    surface: FakeSurface,
    factory: FakeFactory,
) -> (StreamConnector, Arc<FakeSource>, Arc<FakeSurface>, Arc<FakeFactory>) {
    let source = Arc::new(source);
    let surface = Arc::new(surface);
    let factory = Arc::new(factory);
    let connector = StreamConnector::new(
        Arc::clone(&source) as Arc<dyn EventSource>,
        Arc::clone(&surface) as Arc<dyn PlaybackSurface>,
        Arc::clone(&factory) as Arc<dyn EngineFactory>,
    );
    (connector, source, surface, factory)
}

/// Wait until the connector leaves `Connecting`.
async fn settled(connector: &StreamConnector) -> ConnectionState {
    let mut rx = connector.subscribe();
    let settled = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| !s.is_connecting()),
    )
    .await
    .expect("connector should settle")
    .expect("state channel open");
    settled.clone()
}

/// Let spawned tasks run to their next suspension point.
async fn drain_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Test: native playback bypasses the engine entirely
// ---------------------------------------------------------------------------

#[tokio::test]
async fn native_playback_never_constructs_engine() {
    let surface = FakeSurface {
        native: true,
        ..Default::default()
    };
    let factory = FakeFactory {
        supported: true,
        ..Default::default()
    };
    let (connector, _source, surface, factory) = connector(FakeSource::default(), surface, factory);

    connector.connect();
    let state = settled(&connector).await;

    assert_eq!(state, ConnectionState::Playing(PlaybackPath::Native));
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    assert_eq!(*surface.sources.lock().unwrap(), vec![LOCATOR.to_string()]);
}

// ---------------------------------------------------------------------------
// Test: idle -> connecting -> playing through the software engine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn software_engine_path_constructs_engine_once() {
    let factory = FakeFactory {
        supported: true,
        ..Default::default()
    };
    let (connector, _source, surface, factory) =
        connector(FakeSource::default(), FakeSurface::default(), factory);

    let mut rx = connector.subscribe();
    assert_eq!(*rx.borrow_and_update(), ConnectionState::Idle);

    connector.connect();
    assert_eq!(*rx.borrow_and_update(), ConnectionState::Connecting);

    let state = settled(&connector).await;
    assert_eq!(state, ConnectionState::Playing(PlaybackPath::Engine));
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    assert_eq!(*factory.configs.lock().unwrap(), vec![EngineConfig::low_latency()]);
    assert_eq!(*factory.loaded.lock().unwrap(), vec![LOCATOR.to_string()]);
    assert_eq!(factory.destroyed.load(Ordering::SeqCst), 0);
    // The engine feeds the surface; no native source is set.
    assert!(surface.sources.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: no playback path is a terminal failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsupported_format_fails() {
    let (connector, _source, _surface, factory) = connector(
        FakeSource::default(),
        FakeSurface::default(),
        FakeFactory::default(),
    );

    connector.connect();
    let state = settled(&connector).await;

    assert_eq!(state, ConnectionState::Failed(ConnectError::UnsupportedFormat));
    assert_eq!(
        state.error_message(),
        Some("HLS is not supported by this player")
    );
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: locator failure, then manual reconnect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn locator_failure_then_manual_reconnect() {
    let factory = FakeFactory {
        supported: true,
        ..Default::default()
    };
    let (connector, source, _surface, _factory) =
        connector(FakeSource::failing_once(), FakeSurface::default(), factory);

    connector.connect();
    let state = settled(&connector).await;
    assert_matches!(
        state,
        ConnectionState::Failed(ConnectError::LocatorUnavailable(_))
    );
    assert_eq!(
        state.error_message(),
        Some("Failed to connect to the video stream")
    );

    // No automatic retry.
    drain_tasks().await;
    assert_eq!(source.locator_calls.load(Ordering::SeqCst), 1);

    connector.reconnect();
    let state = settled(&connector).await;
    assert_eq!(state, ConnectionState::Playing(PlaybackPath::Engine));
    assert_eq!(source.locator_calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Test: engine start failure releases the engine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attach_failure_reports_engine_error_and_destroys() {
    let factory = FakeFactory {
        supported: true,
        fail_attach: true,
        ..Default::default()
    };
    let (connector, _source, _surface, factory) =
        connector(FakeSource::default(), FakeSurface::default(), factory);

    connector.connect();
    let state = settled(&connector).await;

    assert_matches!(state, ConnectionState::Failed(ConnectError::Engine(_)));
    assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Test: teardown while connecting suppresses later transitions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnect_during_attach_suppresses_playing_and_destroys_engine() {
    let gate = Arc::new(Notify::new());
    let factory = FakeFactory {
        supported: true,
        attach_gate: Some(Arc::clone(&gate)),
        ..Default::default()
    };
    let (connector, _source, _surface, factory) =
        connector(FakeSource::default(), FakeSurface::default(), factory);

    connector.connect();
    // Let the attempt reach the gated attach.
    drain_tasks().await;
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);

    let mut rx = connector.subscribe();
    connector.disconnect();
    assert_eq!(*rx.borrow_and_update(), ConnectionState::Idle);

    gate.notify_one();
    drain_tasks().await;

    assert!(!rx.has_changed().unwrap(), "no transition after teardown");
    assert_eq!(connector.state(), ConnectionState::Idle);
    assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disconnect_before_locator_resolves_keeps_idle() {
    let surface = FakeSurface {
        native: true,
        ..Default::default()
    };
    let (connector, _source, surface, _factory) =
        connector(FakeSource::default(), surface, FakeFactory::default());

    connector.connect();
    connector.disconnect();
    drain_tasks().await;

    assert_eq!(connector.state(), ConnectionState::Idle);
    assert!(surface.sources.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: a new connect releases the previous engine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconnect_replaces_previous_engine() {
    let factory = FakeFactory {
        supported: true,
        ..Default::default()
    };
    let (connector, _source, _surface, factory) =
        connector(FakeSource::default(), FakeSurface::default(), factory);

    connector.connect();
    settled(&connector).await;
    connector.connect();
    let state = settled(&connector).await;

    assert_eq!(state, ConnectionState::Playing(PlaybackPath::Engine));
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);

    drop(connector);
    assert_eq!(factory.destroyed.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Test: a fatal engine error after playback starts fails the connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn engine_runtime_failure_becomes_connection_error() {
    let factory = FakeFactory {
        supported: true,
        ..Default::default()
    };
    let (connector, _source, _surface, factory) =
        connector(FakeSource::default(), FakeSurface::default(), factory);

    connector.connect();
    assert!(settled(&connector).await.is_playing());

    factory.failure_senders.lock().unwrap()[0].send_replace(Some(EngineError::Playlist(
        leftwatch_stream::playlist::PlaylistError::MissingHeader,
    )));

    let mut rx = connector.subscribe();
    let state = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| matches!(s, ConnectionState::Failed(_))),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();

    assert_matches!(state, ConnectionState::Failed(ConnectError::Engine(_)));
    assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Test: disconnect releases the engine and clears the surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnect_after_playing_releases_engine() {
    let factory = FakeFactory {
        supported: true,
        ..Default::default()
    };
    let (connector, _source, surface, factory) =
        connector(FakeSource::default(), FakeSurface::default(), factory);

    connector.connect();
    settled(&connector).await;
    let clears_before = surface.clears.load(Ordering::SeqCst);

    connector.disconnect();

    assert_eq!(connector.state(), ConnectionState::Idle);
    assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(surface.clears.load(Ordering::SeqCst), clears_before + 1);
}

// ---------------------------------------------------------------------------
// Test: the engine is destroyed before the surface is cleared
// ---------------------------------------------------------------------------

#[tokio::test]
async fn teardown_destroys_engine_before_clearing_surface() {
    let teardown = Arc::new(Mutex::new(Vec::new()));
    let surface = FakeSurface {
        teardown: Arc::clone(&teardown),
        ..Default::default()
    };
    let factory = FakeFactory {
        supported: true,
        teardown: Arc::clone(&teardown),
        ..Default::default()
    };
    let (connector, _source, _surface, _factory) =
        connector(FakeSource::default(), surface, factory);

    connector.connect();
    assert!(settled(&connector).await.is_playing());
    teardown.lock().unwrap().clear();

    connector.connect();
    assert_eq!(*teardown.lock().unwrap(), vec!["destroy", "clear"]);
    assert!(settled(&connector).await.is_playing());
    teardown.lock().unwrap().clear();

    connector.disconnect();
    assert_eq!(*teardown.lock().unwrap(), vec!["destroy", "clear"]);
}
