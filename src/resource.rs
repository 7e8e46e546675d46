//! Value types exchanged with the DAV server

use serde::{Deserialize, Serialize};

/// One stored event representation, as fetched from the server.
#[derive(Clone, Debug)]
pub struct FetchedEvent {
    /// Raw iCalendar text of the resource
    pub ical: String,
    /// Concurrency token observed on the GET, if the server sent one
    pub etag: Option<String>,
}

/// Identifies one stored event resource together with the concurrency token
/// last observed for it. The `etag` is opaque: it is only ever compared by
/// the server, never ordered or inspected locally.
///
/// A handle lives for one fetch/write cycle: it is built from a GET and
/// consumed by the next conditional PUT; after a conflict a fresh GET
/// replaces it entirely.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteEventHandle {
    pub calendar_owner_id: String,
    pub calendar_uri: String,
    pub event_uid: String,
    pub etag: Option<String>,
}

/// A calendar as listed at the calendar-home level.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalendarDescriptor {
    pub id: String,
    pub uri: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// One successfully fetched entry of a calendar-multiget REPORT.
#[derive(Clone, Debug, PartialEq)]
pub struct MultigetEvent {
    pub path: String,
    pub etag: String,
    pub ical: String,
}
