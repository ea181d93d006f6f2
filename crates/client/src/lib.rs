//! HTTP client for the left-object detection backend.
//!
//! [`api::EventsApi`] wraps the three endpoints the dashboard needs
//! (event listing, stream locator, status update) plus single-event
//! lookup. [`source::EventSource`] is the seam the feed controller and
//! the stream connector depend on, so both can run against fakes.

pub mod api;
pub mod source;

pub use api::{ApiError, EventsApi, EVENTS_PAGE_SIZE};
pub use source::EventSource;
