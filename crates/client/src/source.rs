//! The event source abstraction consumed by the feed and the stream
//! connector.

use async_trait::async_trait;
use leftwatch_core::types::EventId;
use leftwatch_core::{Event, EventStatus, StatusFilter};

use crate::api::{ApiError, EventsApi};

/// Backend operations the dashboard depends on.
///
/// [`EventsApi`] is the production implementation; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// List events matching `filter`, most-recent-first.
    async fn list_events(&self, filter: StatusFilter) -> Result<Vec<Event>, ApiError>;

    /// Fetch one event by id.
    async fn get_event(&self, id: EventId) -> Result<Event, ApiError>;

    /// URL of the live stream's HLS manifest.
    async fn get_stream_locator(&self) -> Result<String, ApiError>;

    /// Set an event's status and return the stored event.
    async fn set_event_status(&self, id: EventId, status: EventStatus)
        -> Result<Event, ApiError>;
}

#[async_trait]
impl EventSource for EventsApi {
    async fn list_events(&self, filter: StatusFilter) -> Result<Vec<Event>, ApiError> {
        EventsApi::list_events(self, filter).await
    }

    async fn get_event(&self, id: EventId) -> Result<Event, ApiError> {
        EventsApi::get_event(self, id).await
    }

    async fn get_stream_locator(&self) -> Result<String, ApiError> {
        EventsApi::get_stream_locator(self).await
    }

    async fn set_event_status(
        &self,
        id: EventId,
        status: EventStatus,
    ) -> Result<Event, ApiError> {
        EventsApi::set_event_status(self, id, status).await
    }
}
