//! Feed snapshot and the bookkeeping that orders overlapping refreshes.

use leftwatch_core::{Event, StatusFilter};

/// User-facing message shown when a listing request fails.
pub const LOAD_ERROR_MESSAGE: &str = "Failed to load events";

/// What the events panel renders.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    /// Events for `filter`, most-recent-first as served by the backend.
    pub events: Vec<Event>,
    pub filter: StatusFilter,
    /// A refresh is in flight.
    pub loading: bool,
    /// Message from the last failed refresh; cleared when a new one starts.
    pub error: Option<String>,
}

impl FeedSnapshot {
    pub fn new(filter: StatusFilter) -> Self {
        Self {
            events: Vec::new(),
            filter,
            loading: false,
            error: None,
        }
    }

    pub fn total(&self) -> usize {
        self.events.len()
    }
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self::new(StatusFilter::INITIAL)
    }
}

/// Identifies one issued refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub seq: u64,
    pub filter: StatusFilter,
}

/// Result of a listing request, reduced to what the feed keeps.
#[derive(Debug)]
pub(crate) enum Outcome {
    Loaded(Vec<Event>),
    Failed,
}

/// Mutable feed state guarded by the controller's lock.
///
/// Every refresh takes a ticket with a monotonically increasing sequence
/// number. A response is applied only when it is newer than the last
/// applied one and was requested for the current filter, so a slow
/// response can never overwrite a fresher list.
#[derive(Debug)]
pub(crate) struct FeedState {
    pub snapshot: FeedSnapshot,
    issued: u64,
    applied: u64,
    pub unmounted: bool,
}

impl FeedState {
    pub fn new(filter: StatusFilter) -> Self {
        Self {
            snapshot: FeedSnapshot::new(filter),
            issued: 0,
            applied: 0,
            unmounted: false,
        }
    }

    /// Start a refresh for the current filter.
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        self.snapshot.loading = true;
        self.snapshot.error = None;
        Ticket {
            seq: self.issued,
            filter: self.snapshot.filter,
        }
    }

    /// Record the response for `ticket`. Returns whether the snapshot
    /// changed.
    pub fn complete(&mut self, ticket: Ticket, outcome: Outcome) -> bool {
        if self.unmounted {
            return false;
        }

        let mut changed = false;
        if ticket.seq == self.issued && self.snapshot.loading {
            self.snapshot.loading = false;
            changed = true;
        }

        if ticket.filter != self.snapshot.filter || ticket.seq <= self.applied {
            tracing::debug!(
                seq = ticket.seq,
                applied = self.applied,
                filter = %ticket.filter,
                "Discarding stale events response"
            );
            return changed;
        }

        self.applied = ticket.seq;
        match outcome {
            Outcome::Loaded(events) => {
                self.snapshot.events = events;
                self.snapshot.error = None;
            }
            Outcome::Failed => {
                self.snapshot.error = Some(LOAD_ERROR_MESSAGE.to_string());
            }
        }
        true
    }

    /// Switch to `filter`. Returns `false` when it is already active.
    pub fn set_filter(&mut self, filter: StatusFilter) -> bool {
        if self.snapshot.filter == filter {
            return false;
        }
        self.snapshot.filter = filter;
        true
    }
}
