//! Plain-text panels.

use std::fmt::Write;

use leftwatch_core::view::{EventCard, EventDetail};
use leftwatch_core::STATUS_TABS;
use leftwatch_feed::FeedSnapshot;
use leftwatch_stream::{ConnectionState, PlaybackPath};

pub const LOADING_EVENTS: &str = "Loading events...";
pub const NO_EVENTS: &str = "No events yet.";
pub const CONNECTING: &str = "Connecting to stream...";

/// Stream name shown in the panel header.
const STREAM_NAME: &str = "live_stream";

pub fn header(api_base_url: &str) -> String {
    format!(
        "Left object search\nLive monitoring of the video stream and detection events\nBackend: {api_base_url}\n"
    )
}

pub fn stream_panel(state: &ConnectionState, segments: u64) -> String {
    let mut out = format!("== Live stream: {STREAM_NAME} ==\n");
    let body = match state {
        ConnectionState::Idle => "Stream idle".to_string(),
        ConnectionState::Connecting => CONNECTING.to_string(),
        ConnectionState::Playing(PlaybackPath::Native) => "LIVE (native playback)".to_string(),
        ConnectionState::Playing(PlaybackPath::Engine) => {
            format!("LIVE (software engine, {segments} segments received)")
        }
        ConnectionState::Failed(e) => {
            format!("{} (type 'reconnect' to retry)", e.user_message())
        }
    };
    out.push_str(&body);
    out.push('\n');
    out
}

pub fn events_panel(snapshot: &FeedSnapshot) -> String {
    let mut out = String::from("== Left object events ==\n");
    let _ = writeln!(out, "Total: {}", snapshot.total());

    let tabs: Vec<String> = STATUS_TABS
        .iter()
        .map(|tab| {
            if tab.filter == snapshot.filter {
                format!("[{}]", tab.label)
            } else {
                format!(" {} ", tab.label)
            }
        })
        .collect();
    let _ = writeln!(out, "{}", tabs.join(" "));

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "! {error}");
    }

    if snapshot.events.is_empty() {
        if snapshot.loading {
            let _ = writeln!(out, "{LOADING_EVENTS}");
        } else if snapshot.error.is_none() {
            let _ = writeln!(out, "{NO_EVENTS}");
        }
    }

    for event in &snapshot.events {
        out.push_str(&event_card(&EventCard::from(event)));
    }
    out
}

pub fn event_card(card: &EventCard) -> String {
    let mut out = format!("- {}  {}  [{}]\n", card.heading, card.timestamp, card.status_label);
    let _ = write!(out, "    object: {}  owner: {}", card.object_id, card.owner_id);
    if let Some(bbox) = &card.bbox {
        let _ = write!(out, "  bbox: {bbox}");
    }
    out.push('\n');
    let _ = writeln!(out, "    frame: {}", card.thumbnail_url);
    out
}

pub fn detail_view(detail: &EventDetail) -> String {
    let mut out = format!("== {} ==\n", detail.title);
    let _ = writeln!(out, "Time:   {}", detail.timestamp);
    let _ = writeln!(out, "Object: {}", detail.object_id);
    let _ = writeln!(out, "Owner:  {}", detail.owner_id);
    if let Some(bbox) = &detail.bbox {
        let _ = writeln!(out, "BBox:   {bbox}");
    }
    let _ = writeln!(out, "Status: {}", detail.status_label);
    let _ = writeln!(out, "Image:  {}", detail.image_url);
    out.push_str("(type 'close' to close)\n");
    out
}
