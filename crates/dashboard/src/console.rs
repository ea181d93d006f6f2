//! Playback surface for the terminal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use leftwatch_stream::playlist::MediaSegment;
use leftwatch_stream::PlaybackSurface;

/// A surface that cannot decode video. It has no native HLS support, so
/// the connector always drives it through the software engine; segments
/// are counted and logged instead of rendered.
#[derive(Debug, Default)]
pub struct ConsoleSurface {
    source: Mutex<Option<String>>,
    segments: AtomicU64,
    last_segment: Mutex<Option<u64>>,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source set by native playback, if any.
    pub fn source(&self) -> Option<String> {
        self.source
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Segments received since the last source change.
    pub fn segments_received(&self) -> u64 {
        self.segments.load(Ordering::Relaxed)
    }

    /// Sequence number of the most recent segment.
    pub fn last_segment(&self) -> Option<u64> {
        *self.last_segment.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PlaybackSurface for ConsoleSurface {
    fn can_play_type(&self, _mime: &str) -> bool {
        false
    }

    fn set_source(&self, url: &str) {
        tracing::info!(url, "Console surface source set");
        *self.source.lock().unwrap_or_else(|e| e.into_inner()) = Some(url.to_string());
    }

    fn clear_source(&self) {
        *self.source.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.last_segment.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.segments.store(0, Ordering::Relaxed);
    }

    fn push_segment(&self, segment: &MediaSegment) {
        self.segments.fetch_add(1, Ordering::Relaxed);
        *self.last_segment.lock().unwrap_or_else(|e| e.into_inner()) = Some(segment.sequence);
        tracing::debug!(
            sequence = segment.sequence,
            duration = segment.duration,
            uri = %segment.uri,
            "Segment received"
        );
    }
}
