//! Event feed for the monitoring dashboard.
//!
//! [`FeedController`] keeps the list of detection events for the active
//! status filter fresh: it loads immediately, then polls the backend on a
//! fixed interval, and refreshes after every confirm or dismiss. Views
//! observe it through a watch channel of [`FeedSnapshot`]s.

pub mod controller;
pub mod state;

pub use controller::{FeedConfig, FeedController, DEFAULT_POLL_INTERVAL};
pub use state::{FeedSnapshot, LOAD_ERROR_MESSAGE};
