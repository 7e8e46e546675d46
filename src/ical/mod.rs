//! iCalendar/jCal model adapter.
//!
//! Wraps a third-party iCal parser into a mutable document model, plus the
//! read views and the jCal writer the rest of the crate works with. No
//! document outlives the operation that parsed it.

pub mod content;
pub mod datetime;
pub mod document;
pub mod jcal;
pub mod parser;
pub mod participation;

pub use content::{event_content, AlarmDescriptor, EventContent};
pub use datetime::CalDateTime;
pub use document::{Component, Property, Vcalendar};
pub use jcal::to_jcal;
pub use parser::parse;
pub use participation::{
    apply_participation, attendee_emails, find_attendee, organizer_email, PartStat,
};
