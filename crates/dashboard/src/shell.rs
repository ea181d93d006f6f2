//! The dashboard shell: one event feed, one live stream, one optional
//! detail view.

use std::sync::Arc;

use leftwatch_client::{ApiError, EventSource};
use leftwatch_core::types::EventId;
use leftwatch_core::view::EventDetail;
use leftwatch_core::{Event, StatusFilter};
use leftwatch_feed::{FeedConfig, FeedController};
use leftwatch_stream::{EngineFactory, PlaybackSurface, StreamConnector};

use crate::command::{Command, HELP};
use crate::config::DashboardConfig;
use crate::console::ConsoleSurface;
use crate::render;

/// What the command loop does after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Print the text and keep reading commands.
    Continue(String),
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Event #{id} could not be loaded: {source}")]
    EventUnavailable {
        id: EventId,
        #[source]
        source: ApiError,
    },
}

pub struct Shell {
    api_base_url: String,
    source: Arc<dyn EventSource>,
    feed: FeedController,
    stream: StreamConnector,
    surface: Arc<ConsoleSurface>,
    selected: Option<Event>,
}

impl Shell {
    pub fn new(
        config: &DashboardConfig,
        source: Arc<dyn EventSource>,
        engines: Arc<dyn EngineFactory>,
    ) -> Self {
        let surface = Arc::new(ConsoleSurface::new());
        let feed = FeedController::new(
            Arc::clone(&source),
            FeedConfig {
                poll_interval: config.poll_interval,
            },
        );
        let stream = StreamConnector::new(
            Arc::clone(&source),
            Arc::clone(&surface) as Arc<dyn PlaybackSurface>,
            engines,
        );

        Self {
            api_base_url: config.api_base_url.clone(),
            source,
            feed,
            stream,
            surface,
            selected: None,
        }
    }

    /// Start the stream connection and load the first page of events.
    pub async fn start(&self) {
        self.stream.connect();
        self.feed.start().await;
    }

    pub async fn execute(&mut self, command: Command) -> Result<Flow, ShellError> {
        match command {
            Command::Tab(filter) => self.select_tab(filter).await,
            Command::Confirm(id) => self.feed.confirm(id).await,
            Command::Dismiss(id) => self.feed.dismiss(id).await,
            Command::Open(id) => {
                self.open_detail(id).await?;
            }
            Command::Close => {
                if !self.close_detail() {
                    return Ok(Flow::Continue("No event is open.".into()));
                }
            }
            Command::Refresh => self.feed.refresh().await,
            Command::Reconnect => self.stream.reconnect(),
            Command::Show => {}
            Command::Help => return Ok(Flow::Continue(HELP.into())),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue(self.render()))
    }

    pub async fn select_tab(&self, filter: StatusFilter) {
        self.feed.set_filter(filter).await;
    }

    pub fn active_filter(&self) -> StatusFilter {
        self.feed.snapshot().filter
    }

    /// Select an event for the detail view. Events not in the current
    /// list are fetched from the backend.
    pub async fn open_detail(&mut self, id: EventId) -> Result<&Event, ShellError> {
        let listed = self.feed.snapshot().events.into_iter().find(|e| e.id == id);
        let event = match listed {
            Some(event) => event,
            None => self
                .source
                .get_event(id)
                .await
                .map_err(|source| ShellError::EventUnavailable { id, source })?,
        };
        tracing::debug!(event_id = id, "Opened event detail");
        Ok(&*self.selected.insert(event))
    }

    /// Close the detail view. Returns whether one was open.
    pub fn close_detail(&mut self) -> bool {
        self.selected.take().is_some()
    }

    pub fn selected(&self) -> Option<&Event> {
        self.selected.as_ref()
    }

    pub fn feed(&self) -> &FeedController {
        &self.feed
    }

    pub fn stream(&self) -> &StreamConnector {
        &self.stream
    }

    pub fn render(&self) -> String {
        let mut out = render::header(&self.api_base_url);
        out.push('\n');
        out.push_str(&render::stream_panel(
            &self.stream.state(),
            self.surface.segments_received(),
        ));
        out.push('\n');
        out.push_str(&render::events_panel(&self.feed.snapshot()));
        if let Some(event) = &self.selected {
            out.push('\n');
            out.push_str(&render::detail_view(&EventDetail::from(event)));
        }
        out
    }

    /// Stop polling and release the stream.
    pub fn shutdown(&self) {
        self.feed.shutdown();
        self.stream.disconnect();
    }
}
