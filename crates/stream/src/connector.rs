//! Live-stream connection lifecycle.
//!
//! [`StreamConnector`] runs one connection attempt at a time:
//! fetch locator -> pick playback path -> bind -> `Playing`. A new
//! [`connect`](StreamConnector::connect) or a
//! [`disconnect`](StreamConnector::disconnect) cancels the running
//! attempt. Cancellation is cooperative: the attempt's task checks its
//! [`CancellationToken`] under the slot lock before every state change,
//! and teardown cancels under the same lock, so nothing an attempt does
//! after teardown becomes visible.

use std::sync::{Arc, Mutex, MutexGuard};

use leftwatch_client::EventSource;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineConfig, EngineError, EngineFactory, EngineHandle};
use crate::state::{ConnectError, ConnectionState, PlaybackPath};
use crate::surface::PlaybackSurface;

/// Drives the live stream onto a [`PlaybackSurface`].
pub struct StreamConnector {
    source: Arc<dyn EventSource>,
    surface: Arc<dyn PlaybackSurface>,
    engines: Arc<dyn EngineFactory>,
    shared: Arc<Shared>,
}

/// State shared between the connector and its attempt task.
struct Shared {
    state_tx: watch::Sender<ConnectionState>,
    slot: Mutex<Slot>,
}

/// The current attempt.
struct Slot {
    cancel: CancellationToken,
    /// Engine bound by the attempt, once it reached `Playing`.
    engine: Option<EngineHandle>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A poisoned lock only means an attempt task panicked; the slot
        // itself is still consistent.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish `state` unless the attempt owning `cancel` was torn down.
    fn publish(&self, cancel: &CancellationToken, state: ConnectionState) -> bool {
        let _slot = self.lock();
        if cancel.is_cancelled() {
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }
}

impl StreamConnector {
    pub fn new(
        source: Arc<dyn EventSource>,
        surface: Arc<dyn PlaybackSurface>,
        engines: Arc<dyn EngineFactory>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let cancel = CancellationToken::new();
        cancel.cancel();

        Self {
            source,
            surface,
            engines,
            shared: Arc::new(Shared {
                state_tx,
                slot: Mutex::new(Slot {
                    cancel,
                    engine: None,
                }),
            }),
        }
    }

    /// Receive every published [`ConnectionState`].
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state_tx.borrow().clone()
    }

    /// Start a new connection attempt, tearing down the previous one.
    ///
    /// Returns immediately after entering `Connecting`; the attempt runs
    /// on a spawned task. Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let cancel = CancellationToken::new();
        {
            let mut slot = self.shared.lock();
            slot.cancel.cancel();
            slot.cancel = cancel.clone();
            // The old engine must stop pushing before the surface is cleared.
            drop(slot.engine.take());
            self.surface.clear_source();
            self.shared.state_tx.send_replace(ConnectionState::Connecting);
        }

        tracing::info!("Connecting to live stream");

        let attempt = Attempt {
            source: Arc::clone(&self.source),
            surface: Arc::clone(&self.surface),
            engines: Arc::clone(&self.engines),
            shared: Arc::clone(&self.shared),
            cancel,
        };
        tokio::spawn(attempt.run());
    }

    /// Manual retry after a failure. Equivalent to [`connect`](Self::connect).
    pub fn reconnect(&self) {
        tracing::info!("Manual stream reconnect requested");
        self.connect();
    }

    /// Tear down the current attempt and return to `Idle`.
    pub fn disconnect(&self) {
        let mut slot = self.shared.lock();
        slot.cancel.cancel();
        if let Some(engine) = slot.engine.take() {
            tracing::info!("Releasing streaming engine");
            drop(engine);
        }
        self.surface.clear_source();
        self.shared.state_tx.send_replace(ConnectionState::Idle);
    }
}

impl Drop for StreamConnector {
    fn drop(&mut self) {
        let engine = {
            let mut slot = self.shared.lock();
            slot.cancel.cancel();
            slot.engine.take()
        };
        drop(engine);
    }
}

// ---------------------------------------------------------------------------
// Attempt
// ---------------------------------------------------------------------------

/// One connection attempt, run on its own task.
struct Attempt {
    source: Arc<dyn EventSource>,
    surface: Arc<dyn PlaybackSurface>,
    engines: Arc<dyn EngineFactory>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl Attempt {
    async fn run(self) {
        let locator = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = self.source.get_stream_locator() => result,
        };

        let locator = match locator {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch stream locator");
                self.fail(ConnectError::LocatorUnavailable(e.to_string()));
                return;
            }
        };

        match PlaybackPath::resolve(self.surface.as_ref(), self.engines.as_ref()) {
            Some(PlaybackPath::Native) => self.play_native(&locator),
            Some(PlaybackPath::Engine) => self.play_with_engine(&locator).await,
            None => {
                tracing::warn!("No HLS playback path available");
                self.fail(ConnectError::UnsupportedFormat);
            }
        }
    }

    fn play_native(&self, locator: &str) {
        let _slot = self.shared.lock();
        if self.cancel.is_cancelled() {
            return;
        }
        self.surface.set_source(locator);
        self.shared
            .state_tx
            .send_replace(ConnectionState::Playing(PlaybackPath::Native));
        tracing::info!(url = %locator, "Playing stream natively");
    }

    async fn play_with_engine(&self, locator: &str) {
        let mut handle = match self.engines.create(EngineConfig::low_latency()) {
            Ok(engine) => EngineHandle::new(engine),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create streaming engine");
                self.fail(ConnectError::Engine(e.to_string()));
                return;
            }
        };

        // Dropping `handle` on any early return destroys the engine.
        let bound = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = bind(&mut handle, locator, Arc::clone(&self.surface)) => result,
        };
        if let Err(e) = bound {
            tracing::error!(error = %e, "Streaming engine failed to start");
            drop(handle);
            self.fail(ConnectError::Engine(e.to_string()));
            return;
        }

        let failures = handle.failures();
        {
            let mut slot = self.shared.lock();
            if self.cancel.is_cancelled() {
                drop(slot);
                drop(handle);
                return;
            }
            slot.engine = Some(handle);
            self.shared
                .state_tx
                .send_replace(ConnectionState::Playing(PlaybackPath::Engine));
        }
        tracing::info!(url = %locator, "Playing stream through software engine");

        self.watch_engine(failures).await;
    }

    /// Turn a fatal engine error into `Failed` for as long as this attempt
    /// is current.
    async fn watch_engine(&self, mut failures: watch::Receiver<Option<EngineError>>) {
        let error = loop {
            if let Some(e) = failures.borrow_and_update().clone() {
                break e;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                changed = failures.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        };

        let engine = {
            let mut slot = self.shared.lock();
            if self.cancel.is_cancelled() {
                return;
            }
            self.shared
                .state_tx
                .send_replace(ConnectionState::Failed(ConnectError::Engine(error.to_string())));
            slot.engine.take()
        };
        tracing::error!(error = %error, "Streaming engine stopped");
        drop(engine);
    }

    fn fail(&self, error: ConnectError) {
        self.shared
            .publish(&self.cancel, ConnectionState::Failed(error));
    }
}

async fn bind(
    handle: &mut EngineHandle,
    locator: &str,
    surface: Arc<dyn PlaybackSurface>,
) -> Result<(), EngineError> {
    let engine = handle.engine_mut();
    engine.load_source(locator).await?;
    engine.attach(surface).await
}
