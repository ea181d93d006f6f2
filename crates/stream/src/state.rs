//! Connection state published by the stream connector.

use crate::engine::EngineFactory;
use crate::surface::{PlaybackSurface, HLS_MIME_TYPE};

/// Message shown when neither playback path is available.
pub const UNSUPPORTED_MESSAGE: &str = "HLS is not supported by this player";

/// Message shown for every other connection failure.
pub const CONNECT_FAILED_MESSAGE: &str = "Failed to connect to the video stream";

/// How the stream reaches the surface. Resolved once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPath {
    /// The surface plays the HLS manifest itself.
    Native,
    /// A software engine downloads segments and feeds the surface.
    Engine,
}

impl PlaybackPath {
    /// Pick the playback path for `surface`.
    ///
    /// Native playback wins; the engine factory is only consulted when the
    /// surface cannot play HLS. Returns `None` when neither is available.
    pub fn resolve(
        surface: &dyn PlaybackSurface,
        engines: &dyn EngineFactory,
    ) -> Option<PlaybackPath> {
        if surface.can_play_type(HLS_MIME_TYPE) {
            Some(PlaybackPath::Native)
        } else if engines.is_supported() {
            Some(PlaybackPath::Engine)
        } else {
            None
        }
    }
}

/// Why a connection attempt failed. Every failure is terminal for the
/// attempt; nothing reconnects automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// The backend did not return a stream locator.
    #[error("Stream locator unavailable: {0}")]
    LocatorUnavailable(String),

    /// Neither native playback nor a software engine is available.
    #[error("HLS playback is not supported")]
    UnsupportedFormat,

    /// The software engine failed to start or stopped with an error.
    #[error("Streaming engine error: {0}")]
    Engine(String),
}

impl ConnectError {
    /// Operator-facing message for the stream panel.
    pub fn user_message(&self) -> &'static str {
        match self {
            ConnectError::UnsupportedFormat => UNSUPPORTED_MESSAGE,
            ConnectError::LocatorUnavailable(_) | ConnectError::Engine(_) => {
                CONNECT_FAILED_MESSAGE
            }
        }
    }
}

/// `Idle -> Connecting -> Playing`, or `Connecting -> Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Playing(PlaybackPath),
    Failed(ConnectError),
}

impl ConnectionState {
    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionState::Connecting)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, ConnectionState::Playing(_))
    }

    /// Operator-facing error, if the last attempt failed.
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            ConnectionState::Failed(e) => Some(e.user_message()),
            _ => None,
        }
    }
}
