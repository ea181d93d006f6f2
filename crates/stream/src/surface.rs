//! The display side of the stream: whatever ends up showing the video.

use crate::playlist::MediaSegment;

/// MIME type of an HLS manifest, used for the native capability probe.
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// A place the live stream is rendered to.
///
/// Implementations use interior mutability; the connector and the
/// software engine share one surface behind an `Arc`.
pub trait PlaybackSurface: Send + Sync {
    /// Whether the surface can play `mime` without an auxiliary engine.
    fn can_play_type(&self, mime: &str) -> bool;

    /// Point native playback at a manifest URL.
    fn set_source(&self, url: &str);

    /// Drop whatever the surface is currently playing.
    fn clear_source(&self);

    /// Receive the next media segment from a software engine, in
    /// sequence order.
    fn push_segment(&self, segment: &MediaSegment);
}
