//! Software streaming engine abstraction.
//!
//! Used only when the surface cannot play HLS natively. An engine is
//! created per connection attempt, loaded with the locator, attached to
//! the surface and destroyed when the attempt is torn down.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::playlist::PlaylistError;
use crate::surface::PlaybackSurface;

/// Tunables passed to [`EngineFactory::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Run playlist refreshes on a background task.
    pub enable_worker: bool,
    /// Start at the live edge and reload the playlist more often.
    pub low_latency_mode: bool,
}

impl EngineConfig {
    /// Configuration the connector uses for live monitoring.
    pub const fn low_latency() -> Self {
        Self {
            enable_worker: true,
            low_latency_mode: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_worker: true,
            low_latency_mode: false,
        }
    }
}

/// Errors raised by a software engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid source URL '{url}': {reason}")]
    InvalidSource { url: String, reason: String },

    #[error("No source loaded")]
    NoSource,

    #[error("Failed to fetch playlist: {0}")]
    Fetch(String),

    #[error("Invalid playlist: {0}")]
    Playlist(#[from] PlaylistError),

    #[error("Engine already destroyed")]
    Destroyed,
}

impl EngineError {
    /// Whether the engine must stop. Fetch failures are retried on the
    /// next playlist reload.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::Fetch(_))
    }
}

/// A software engine bound to one stream.
#[async_trait]
pub trait StreamEngine: Send + Sync {
    /// Remember the manifest URL to play.
    async fn load_source(&mut self, url: &str) -> Result<(), EngineError>;

    /// Start feeding the loaded source to `surface`.
    async fn attach(&mut self, surface: Arc<dyn PlaybackSurface>) -> Result<(), EngineError>;

    /// Receives the error that stopped the engine after it was attached.
    fn failures(&self) -> watch::Receiver<Option<EngineError>>;

    /// Release every resource held by the engine. Idempotent.
    fn destroy(&mut self);
}

/// Capability check plus constructor for software engines.
pub trait EngineFactory: Send + Sync {
    /// Whether this runtime can run the engine at all.
    fn is_supported(&self) -> bool;

    fn create(&self, config: EngineConfig) -> Result<Box<dyn StreamEngine>, EngineError>;
}

/// Owns an engine and destroys it when dropped.
///
/// The connector moves the handle between its setup task and its shared
/// slot; whichever side drops it releases the engine, exactly once.
pub struct EngineHandle {
    engine: Box<dyn StreamEngine>,
}

impl EngineHandle {
    pub fn new(engine: Box<dyn StreamEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_mut(&mut self) -> &mut dyn StreamEngine {
        self.engine.as_mut()
    }

    pub fn failures(&self) -> watch::Receiver<Option<EngineError>> {
        self.engine.failures()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.engine.destroy();
    }
}
