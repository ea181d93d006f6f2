//! Detection event model and the status filter applied to the feed.
//!
//! [`Event`] mirrors the backend's JSON shape field for field. Status
//! values travel as lower-case strings (`"new"`, `"confirmed"`,
//! `"dismissed"`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EventId, Timestamp, TrackId};

pub const STATUS_NEW: &str = "new";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_DISMISSED: &str = "dismissed";

/// Query value accepted by [`StatusFilter::from_str`] for "no filter".
pub const FILTER_ALL: &str = "all";

// ---------------------------------------------------------------------------
// EventStatus
// ---------------------------------------------------------------------------

/// Review state of a detection event.
///
/// Every event starts as [`EventStatus::New`] and only moves when an
/// operator confirms or dismisses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    New,
    Confirmed,
    Dismissed,
}

impl EventStatus {
    /// All statuses in display order.
    pub const ALL: [EventStatus; 3] = [
        EventStatus::New,
        EventStatus::Confirmed,
        EventStatus::Dismissed,
    ];

    /// Wire representation used in query strings and JSON bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::New => STATUS_NEW,
            EventStatus::Confirmed => STATUS_CONFIRMED,
            EventStatus::Dismissed => STATUS_DISMISSED,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            STATUS_NEW => Ok(EventStatus::New),
            STATUS_CONFIRMED => Ok(EventStatus::Confirmed),
            STATUS_DISMISSED => Ok(EventStatus::Dismissed),
            other => Err(CoreError::Validation(format!(
                "unknown event status '{other}', expected one of: new, confirmed, dismissed"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// StatusFilter
// ---------------------------------------------------------------------------

/// Which events the feed displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    /// No `status` query parameter; every status is listed.
    All,
    /// Only events currently in the given status.
    Only(EventStatus),
}

impl StatusFilter {
    /// Filter the feed starts with when it is first mounted.
    pub const INITIAL: StatusFilter = StatusFilter::Only(EventStatus::New);

    /// The status to send to the backend, if any.
    pub fn status(self) -> Option<EventStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(status),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => FILTER_ALL,
            StatusFilter::Only(status) => status.as_str(),
        }
    }
}

impl From<EventStatus> for StatusFilter {
    fn from(status: EventStatus) -> Self {
        StatusFilter::Only(status)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == FILTER_ALL {
            return Ok(StatusFilter::All);
        }
        s.parse::<EventStatus>()
            .map(StatusFilter::Only)
            .map_err(|_| {
                CoreError::Validation(format!(
                    "unknown status filter '{s}', expected one of: all, new, confirmed, dismissed"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Status tabs
// ---------------------------------------------------------------------------

/// A selectable tab in the events panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTab {
    pub label: &'static str,
    pub filter: StatusFilter,
}

/// Tabs in the order the events panel shows them.
pub const STATUS_TABS: [StatusTab; 4] = [
    StatusTab {
        label: "All",
        filter: StatusFilter::All,
    },
    StatusTab {
        label: "New",
        filter: StatusFilter::Only(EventStatus::New),
    },
    StatusTab {
        label: "Confirmed",
        filter: StatusFilter::Only(EventStatus::Confirmed),
    },
    StatusTab {
        label: "Dismissed",
        filter: StatusFilter::Only(EventStatus::Dismissed),
    },
];

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One detected left-object occurrence as returned by `GET /events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// `None` until the event is linked to a tracked object.
    pub object_id: Option<TrackId>,
    /// `None` until the event is linked to an owner.
    pub owner_id: Option<TrackId>,
    /// Bounding box `[x1, y1, x2, y2]` in frame pixels.
    pub bbox: Option<[f64; 4]>,
    pub frame_snapshot_url: String,
    pub status: EventStatus,
    /// When the event occurred.
    pub event_timestamp: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SAMPLE: &str = r#"{
        "id": 7,
        "object_id": null,
        "owner_id": 3,
        "bbox": [10.4, 20.0, 30.6, 40.0],
        "frame_snapshot_url": "http://127.0.0.1:8000/snapshots/7.jpg",
        "status": "new",
        "event_timestamp": "2025-03-01T10:15:30.123456+00:00",
        "created_at": "2025-03-01T10:15:31+00:00",
        "updated_at": "2025-03-01T10:15:31Z"
    }"#;

    #[test]
    fn deserializes_backend_shape() {
        let event: Event = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(event.id, 7);
        assert_eq!(event.object_id, None);
        assert_eq!(event.owner_id, Some(3));
        assert_eq!(event.bbox, Some([10.4, 20.0, 30.6, 40.0]));
        assert_eq!(event.status, EventStatus::New);
        assert_eq!(
            event.event_timestamp.to_rfc3339(),
            "2025-03-01T10:15:30.123456+00:00"
        );
    }

    #[test]
    fn null_bbox_is_none() {
        let json = SAMPLE.replace("[10.4, 20.0, 30.6, 40.0]", "null");
        let event: Event = serde_json::from_str(&json).unwrap();
        assert!(event.bbox.is_none());
    }

    #[test]
    fn non_utc_offset_is_normalised() {
        let json = SAMPLE.replace(
            "2025-03-01T10:15:30.123456+00:00",
            "2025-03-01T13:15:30+03:00",
        );
        let event: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.event_timestamp.to_rfc3339(), "2025-03-01T10:15:30+00:00");
    }

    #[test]
    fn unknown_status_is_rejected_by_serde() {
        let json = SAMPLE.replace("\"new\"", "\"archived\"");
        assert!(serde_json::from_str::<Event>(&json).is_err());
    }

    #[test]
    fn status_parses_wire_values() {
        for status in EventStatus::ALL {
            assert_eq!(status.as_str().parse::<EventStatus>().unwrap(), status);
        }
        assert_matches!("New".parse::<EventStatus>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn filter_parses_all_and_statuses() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "dismissed".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(EventStatus::Dismissed)
        );
        assert_matches!("".parse::<StatusFilter>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn filter_status_maps_to_query_value() {
        assert_eq!(StatusFilter::All.status(), None);
        assert_eq!(
            StatusFilter::from(EventStatus::Confirmed).status(),
            Some(EventStatus::Confirmed)
        );
    }

    #[test]
    fn tabs_cover_every_filter_once() {
        assert_eq!(STATUS_TABS[0].filter, StatusFilter::All);
        for status in EventStatus::ALL {
            let count = STATUS_TABS
                .iter()
                .filter(|tab| tab.filter == StatusFilter::Only(status))
                .count();
            assert_eq!(count, 1, "{status} should have exactly one tab");
        }
    }

    #[test]
    fn initial_filter_is_new() {
        assert_eq!(StatusFilter::INITIAL, StatusFilter::Only(EventStatus::New));
    }
}
