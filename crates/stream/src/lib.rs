//! Live-stream connection for the monitoring dashboard.
//!
//! [`connector::StreamConnector`] asks the backend for the HLS locator,
//! decides once whether the [`surface::PlaybackSurface`] can play HLS
//! natively or needs a software [`engine::StreamEngine`], and publishes
//! the resulting [`state::ConnectionState`] on a watch channel.
//!
//! [`hls::HlsEngine`] is the bundled software engine: it follows the
//! media playlist (see [`playlist`]) and feeds segments to the surface.

pub mod connector;
pub mod engine;
pub mod hls;
pub mod playlist;
pub mod state;
pub mod surface;

pub use connector::StreamConnector;
pub use engine::{EngineConfig, EngineError, EngineFactory, StreamEngine};
pub use hls::{HlsEngine, HlsEngineFactory};
pub use state::{ConnectError, ConnectionState, PlaybackPath};
pub use surface::{PlaybackSurface, HLS_MIME_TYPE};
