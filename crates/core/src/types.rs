/// Backend event identifiers are integer primary keys.
pub type EventId = i64;

/// Tracked object and owner identifiers assigned by the ML service.
pub type TrackId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
