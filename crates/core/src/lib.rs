//! Shared domain types for the leftwatch monitoring client.
//!
//! Holds the detection [`event::Event`] model as the backend serves it,
//! the status filter and tab definitions used by the feed, and the pure
//! formatting helpers behind the event card and detail views.

pub mod error;
pub mod event;
pub mod types;
pub mod view;

pub use error::CoreError;
pub use event::{Event, EventStatus, StatusFilter, StatusTab, STATUS_TABS};
