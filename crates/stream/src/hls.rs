//! Software HLS engine.
//!
//! [`HlsEngine`] downloads the live media playlist with [`reqwest`],
//! follows a master playlist to its first variant, and pushes every new
//! segment to the attached [`PlaybackSurface`] in sequence order. The
//! playlist is reloaded once per target duration (twice as often in
//! low-latency mode) until the engine is destroyed or the playlist ends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::engine::{EngineConfig, EngineError, EngineFactory, StreamEngine};
use crate::playlist::{self, MediaPlaylist, Playlist, PlaylistError};
use crate::surface::PlaybackSurface;

/// Segments kept behind the live edge when not in low-latency mode.
const LIVE_SYNC_SEGMENTS: usize = 3;

/// Lower bound on the reload interval, for playlists that advertise a
/// zero target duration.
const MIN_RELOAD_INTERVAL: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds [`HlsEngine`]s that share one HTTP client.
#[derive(Clone, Default)]
pub struct HlsEngineFactory {
    client: reqwest::Client,
}

impl HlsEngineFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl EngineFactory for HlsEngineFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self, config: EngineConfig) -> Result<Box<dyn StreamEngine>, EngineError> {
        Ok(Box::new(HlsEngine::new(self.client.clone(), config)))
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct HlsEngine {
    client: reqwest::Client,
    config: EngineConfig,
    source: Option<Url>,
    cancel: CancellationToken,
    failure_tx: watch::Sender<Option<EngineError>>,
    task: Option<tokio::task::JoinHandle<()>>,
    destroyed: bool,
}

impl HlsEngine {
    pub fn new(client: reqwest::Client, config: EngineConfig) -> Self {
        let (failure_tx, _) = watch::channel(None);
        Self {
            client,
            config,
            source: None,
            cancel: CancellationToken::new(),
            failure_tx,
            task: None,
            destroyed: false,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

#[async_trait]
impl StreamEngine for HlsEngine {
    async fn load_source(&mut self, url: &str) -> Result<(), EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }

        let parsed = Url::parse(url).map_err(|e| EngineError::InvalidSource {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(EngineError::InvalidSource {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        tracing::debug!(url = %parsed, "HLS source loaded");
        self.source = Some(parsed);
        Ok(())
    }

    async fn attach(&mut self, surface: Arc<dyn PlaybackSurface>) -> Result<(), EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        let source = self.source.clone().ok_or(EngineError::NoSource)?;

        let mut session = PlaylistSession {
            client: self.client.clone(),
            playlist_url: source,
            low_latency: self.config.low_latency_mode,
            surface,
            cancel: self.cancel.clone(),
            next_sequence: None,
        };

        // Without a worker the first load happens before attach returns,
        // so load errors surface to the caller.
        let first_delay = if self.config.enable_worker {
            Duration::ZERO
        } else {
            match session.poll_once().await? {
                PollOutcome::Reload(delay) => delay,
                PollOutcome::Ended => return Ok(()),
            }
        };

        let failure_tx = self.failure_tx.clone();
        self.task = Some(tokio::spawn(async move {
            session.run(first_delay, failure_tx).await;
        }));

        tracing::info!(
            low_latency = self.config.low_latency_mode,
            "HLS engine attached"
        );
        Ok(())
    }

    fn failures(&self) -> watch::Receiver<Option<EngineError>> {
        self.failure_tx.subscribe()
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::debug!("HLS engine destroyed");
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ---------------------------------------------------------------------------
// Playlist session
// ---------------------------------------------------------------------------

enum PollOutcome {
    /// Reload the playlist after the given delay.
    Reload(Duration),
    /// The playlist ended; nothing more to fetch.
    Ended,
}

/// State of the refresh loop for one attached engine.
struct PlaylistSession {
    client: reqwest::Client,
    /// Media playlist URL (replaced by the variant URL after a master).
    playlist_url: Url,
    low_latency: bool,
    surface: Arc<dyn PlaybackSurface>,
    /// Cancelled when the owning engine is destroyed.
    cancel: CancellationToken,
    /// Sequence number of the next segment to feed.
    next_sequence: Option<u64>,
}

impl PlaylistSession {
    async fn run(
        mut self,
        first_delay: Duration,
        failure_tx: watch::Sender<Option<EngineError>>,
    ) {
        let cancel = self.cancel.clone();
        let mut delay = first_delay;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = self.poll_once() => outcome,
            };

            match outcome {
                Ok(PollOutcome::Reload(next)) => delay = next,
                Ok(PollOutcome::Ended) => {
                    tracing::info!(url = %self.playlist_url, "HLS playlist ended");
                    return;
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(url = %self.playlist_url, error = %e, "HLS engine stopped");
                    failure_tx.send_replace(Some(e));
                    return;
                }
                Err(e) => {
                    tracing::warn!(url = %self.playlist_url, error = %e, "Playlist reload failed");
                    delay = MIN_RELOAD_INTERVAL.max(delay);
                }
            }
        }
    }

    /// Fetch the playlist once and feed any new segments.
    async fn poll_once(&mut self) -> Result<PollOutcome, EngineError> {
        match self.fetch().await? {
            Playlist::Master(master) => {
                let variant = master.variants.first().ok_or(PlaylistError::NoVariants)?;
                self.playlist_url = playlist::resolve_uri(&self.playlist_url, &variant.uri)?;
                tracing::debug!(url = %self.playlist_url, "Following first HLS variant");
                Ok(PollOutcome::Reload(Duration::ZERO))
            }
            Playlist::Media(media) => {
                self.feed(&media)?;
                if media.ended {
                    Ok(PollOutcome::Ended)
                } else {
                    Ok(PollOutcome::Reload(self.reload_interval(&media)))
                }
            }
        }
    }

    async fn fetch(&self) -> Result<Playlist, EngineError> {
        let response = self
            .client
            .get(self.playlist_url.clone())
            .send()
            .await
            .map_err(|e| EngineError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Fetch(format!("HTTP {}", status.as_u16())));
        }

        let text = response
            .text()
            .await
            .map_err(|e| EngineError::Fetch(e.to_string()))?;

        Ok(playlist::parse(&text)?)
    }

    /// Push segments the surface has not seen yet.
    ///
    /// A playlist whose newest segment is older than the last one fed means
    /// the server restarted its media sequence; feeding then resumes from the
    /// live edge of the new numbering.
    fn feed(&mut self, media: &MediaPlaylist) -> Result<(), EngineError> {
        if let (Some(next), Some(last)) = (self.next_sequence, media.segments.last()) {
            if last.sequence.saturating_add(1) < next {
                tracing::warn!(
                    url = %self.playlist_url,
                    expected = next,
                    last = last.sequence,
                    "HLS media sequence went backwards, resyncing to live edge"
                );
                self.next_sequence = None;
            }
        }

        let start = match self.next_sequence {
            Some(next) => next,
            None => {
                let behind = if self.low_latency { 1 } else { LIVE_SYNC_SEGMENTS };
                let index = media.segments.len().saturating_sub(behind);
                media
                    .segments
                    .get(index)
                    .map_or(media.media_sequence, |s| s.sequence)
            }
        };

        let mut next = start;
        for segment in media.segments.iter().filter(|s| s.sequence >= start) {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            let mut resolved = segment.clone();
            resolved.uri = playlist::resolve_uri(&self.playlist_url, &segment.uri)?.into();
            self.surface.push_segment(&resolved);
            // Parsed sequences stay below u64::MAX.
            next = segment.sequence.saturating_add(1);
        }

        self.next_sequence = Some(next);
        Ok(())
    }

    fn reload_interval(&self, media: &MediaPlaylist) -> Duration {
        let target = Duration::from_secs(media.target_duration);
        let interval = if self.low_latency { target / 2 } else { target };
        interval.max(MIN_RELOAD_INTERVAL)
    }
}
