//! Presentation of a single event for the card list and the detail view.
//!
//! Everything here is a pure function of an [`Event`]; nothing holds
//! state between calls.

use chrono::Local;

use crate::event::{Event, EventStatus};
use crate::types::{EventId, Timestamp, TrackId};

/// Placeholder shown for identifiers the backend has not linked yet.
pub const MISSING_ID: &str = "—";

/// Separator between bounding-box coordinates.
const BBOX_SEPARATOR: &str = " × ";

/// Human-readable label for a status badge.
pub fn status_label(status: EventStatus) -> &'static str {
    match status {
        EventStatus::New => "New",
        EventStatus::Confirmed => "Confirmed",
        EventStatus::Dismissed => "Dismissed",
    }
}

/// Render an optional track id, falling back to [`MISSING_ID`].
pub fn format_track_id(id: Option<TrackId>) -> String {
    id.map_or_else(|| MISSING_ID.to_string(), |id| id.to_string())
}

/// Render a bounding box with each coordinate rounded to a whole pixel.
pub fn format_bbox(bbox: &[f64; 4]) -> String {
    bbox.iter()
        .map(|v| format!("{}", v.round() as i64))
        .collect::<Vec<_>>()
        .join(BBOX_SEPARATOR)
}

/// Render a timestamp in the operator's local timezone.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Compact summary shown for each event in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCard {
    pub id: EventId,
    pub heading: String,
    pub timestamp: String,
    pub status: EventStatus,
    pub status_label: &'static str,
    pub object_id: String,
    pub owner_id: String,
    pub bbox: Option<String>,
    pub thumbnail_url: String,
}

impl From<&Event> for EventCard {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            heading: format!("ID #{}", event.id),
            timestamp: format_timestamp(&event.event_timestamp),
            status: event.status,
            status_label: status_label(event.status),
            object_id: format_track_id(event.object_id),
            owner_id: format_track_id(event.owner_id),
            bbox: event.bbox.as_ref().map(format_bbox),
            thumbnail_url: event.frame_snapshot_url.clone(),
        }
    }
}

/// Full-size view of one selected event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetail {
    pub title: String,
    pub timestamp: String,
    pub object_id: String,
    pub owner_id: String,
    pub bbox: Option<String>,
    pub status_label: &'static str,
    pub image_url: String,
}

impl From<&Event> for EventDetail {
    fn from(event: &Event) -> Self {
        Self {
            title: format!("Event #{}", event.id),
            timestamp: format_timestamp(&event.event_timestamp),
            object_id: format_track_id(event.object_id),
            owner_id: format_track_id(event.owner_id),
            bbox: event.bbox.as_ref().map(format_bbox),
            status_label: status_label(event.status),
            image_url: event.frame_snapshot_url.clone(),
        }
    }
}
