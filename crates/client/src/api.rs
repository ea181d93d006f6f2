//! REST client for the detection backend's HTTP endpoints.
//!
//! Wraps event listing, single-event lookup, status updates and the HLS
//! stream locator using [`reqwest`]. Requests are never retried.

use leftwatch_core::types::EventId;
use leftwatch_core::{Event, EventStatus, StatusFilter};
use serde::{Deserialize, Serialize};

/// Maximum number of events requested per listing. The feed never pages
/// past the first batch.
pub const EVENTS_PAGE_SIZE: u32 = 100;

/// HTTP client for one backend instance.
#[derive(Clone)]
pub struct EventsApi {
    client: reqwest::Client,
    base_url: String,
}

/// Query string for `GET /events`.
#[derive(Debug, Serialize)]
struct ListEventsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<EventStatus>,
    limit: u32,
    offset: u32,
}

/// Body of `PATCH /events/{id}`.
#[derive(Debug, Serialize)]
struct StatusUpdate {
    status: EventStatus,
}

/// Response of `GET /streams/hls`.
#[derive(Debug, Deserialize)]
struct StreamLocatorResponse {
    hls_url: String,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the body could not be decoded
    /// (unreachable host, DNS, TLS, malformed JSON).
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ApiError {
    /// HTTP status code for [`ApiError::Http`] failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

impl EventsApi {
    /// Create a new API client for a backend.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://127.0.0.1:8000`. A
    ///   trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (e.g. one built with a request timeout).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the most recent events, optionally restricted to one status.
    ///
    /// Sends `GET /events?status=..&limit=100&offset=0`. The backend
    /// orders results most-recent-first; the order is preserved.
    pub async fn list_events(&self, filter: StatusFilter) -> Result<Vec<Event>, ApiError> {
        let query = ListEventsQuery {
            status: filter.status(),
            limit: EVENTS_PAGE_SIZE,
            offset: 0,
        };

        let response = self
            .client
            .get(format!("{}/events", self.base_url))
            .query(&query)
            .send()
            .await?;

        let events: Vec<Event> = Self::parse_response(response).await?;
        tracing::debug!(filter = %filter, count = events.len(), "Fetched events");
        Ok(events)
    }

    /// Fetch a single event by id via `GET /events/{id}`.
    pub async fn get_event(&self, id: EventId) -> Result<Event, ApiError> {
        let response = self
            .client
            .get(format!("{}/events/{}", self.base_url, id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the HLS manifest URL of the live stream via `GET /streams/hls`.
    pub async fn get_stream_locator(&self) -> Result<String, ApiError> {
        let response = self
            .client
            .get(format!("{}/streams/hls", self.base_url))
            .send()
            .await?;

        let locator: StreamLocatorResponse = Self::parse_response(response).await?;
        Ok(locator.hls_url)
    }

    /// Change an event's status via `PATCH /events/{id}`.
    ///
    /// Returns the event as the backend stored it.
    pub async fn set_event_status(
        &self,
        id: EventId,
        status: EventStatus,
    ) -> Result<Event, ApiError> {
        let response = self
            .client
            .patch(format!("{}/events/{}", self.base_url, id))
            .json(&StatusUpdate { status })
            .send()
            .await?;

        let event: Event = Self::parse_response(response).await?;
        tracing::info!(event_id = id, status = %event.status, "Event status updated");
        Ok(event)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Http`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
