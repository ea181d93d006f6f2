//! Polling controller for the event list.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use leftwatch_client::EventSource;
use leftwatch_core::types::EventId;
use leftwatch_core::{EventStatus, StatusFilter};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::state::{FeedSnapshot, FeedState, Outcome};

/// How often the feed re-fetches the list while mounted.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    pub poll_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// ---------------------------------------------------------------------------
// FeedController
// ---------------------------------------------------------------------------

/// Owns the event list for the active filter.
///
/// Call [`start`](Self::start) once to load and begin polling. Ticks of the
/// poll timer spawn their refresh without waiting for the previous one, so
/// requests may overlap; responses are ordered by sequence number before
/// they reach the snapshot.
pub struct FeedController {
    inner: Arc<Inner>,
    config: FeedConfig,
    /// Cancels the running poll timer.
    timer: Mutex<CancellationToken>,
}

struct Inner {
    source: Arc<dyn EventSource>,
    state: Mutex<FeedState>,
    snapshot_tx: watch::Sender<FeedSnapshot>,
}

impl FeedController {
    /// Create an idle controller showing [`StatusFilter::INITIAL`].
    pub fn new(source: Arc<dyn EventSource>, config: FeedConfig) -> Self {
        let state = FeedState::new(StatusFilter::INITIAL);
        let (snapshot_tx, _) = watch::channel(state.snapshot.clone());
        let timer = CancellationToken::new();
        timer.cancel();

        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(state),
                snapshot_tx,
            }),
            config,
            timer: Mutex::new(timer),
        }
    }

    /// Load the list now and start the poll timer.
    pub async fn start(&self) {
        tracing::info!(
            filter = %self.snapshot().filter,
            interval_secs = self.config.poll_interval.as_secs_f64(),
            "Starting event feed"
        );
        self.restart_timer();
        self.inner.refresh().await;
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Switch the active filter, reload immediately and restart the timer.
    ///
    /// Selecting the filter that is already active does nothing.
    pub async fn set_filter(&self, filter: StatusFilter) {
        {
            let mut state = self.inner.lock();
            if state.unmounted || !state.set_filter(filter) {
                return;
            }
            self.inner.publish(&state);
        }
        tracing::info!(filter = %filter, "Event filter changed");

        self.restart_timer();
        self.inner.refresh().await;
    }

    /// Re-fetch the list for the current filter.
    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }

    /// Mark an event confirmed, then refresh once.
    pub async fn confirm(&self, id: EventId) {
        self.update_status(id, EventStatus::Confirmed).await;
    }

    /// Mark an event dismissed, then refresh once.
    pub async fn dismiss(&self, id: EventId) {
        self.update_status(id, EventStatus::Dismissed).await;
    }

    /// Stop polling and ignore every response that arrives afterwards.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.lock();
            if state.unmounted {
                return;
            }
            state.unmounted = true;
        }
        self.timer_lock().cancel();
        tracing::info!("Event feed stopped");
    }

    async fn update_status(&self, id: EventId, status: EventStatus) {
        match self.inner.source.set_event_status(id, status).await {
            Ok(event) => {
                tracing::debug!(event_id = event.id, status = %event.status, "Event status change applied");
            }
            Err(e) => {
                tracing::error!(event_id = id, status = %status, error = %e, "Failed to update event status");
            }
        }
        self.inner.refresh().await;
    }

    /// Cancel the current timer and start a new one whose first tick is
    /// one full interval from now.
    fn restart_timer(&self) {
        let cancel = CancellationToken::new();
        {
            let mut timer = self.timer_lock();
            timer.cancel();
            *timer = cancel.clone();
        }

        let inner = Arc::clone(&self.inner);
        let period = self.config.poll_interval;
        let first_tick = Instant::now() + period;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let inner = Arc::clone(&inner);
                        tokio::spawn(async move { inner.refresh().await });
                    }
                }
            }
            tracing::debug!("Event poll timer cancelled");
        });
    }

    fn timer_lock(&self) -> MutexGuard<'_, CancellationToken> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: &FeedState) {
        self.snapshot_tx.send_replace(state.snapshot.clone());
    }

    async fn refresh(&self) {
        let ticket = {
            let mut state = self.lock();
            if state.unmounted {
                return;
            }
            let ticket = state.begin();
            self.publish(&state);
            ticket
        };

        let outcome = match self.source.list_events(ticket.filter).await {
            Ok(events) => {
                tracing::debug!(filter = %ticket.filter, count = events.len(), "Events loaded");
                Outcome::Loaded(events)
            }
            Err(e) => {
                tracing::warn!(filter = %ticket.filter, error = %e, "Failed to load events");
                Outcome::Failed
            }
        };

        let mut state = self.lock();
        if state.complete(ticket, outcome) {
            self.publish(&state);
        }
    }
}
