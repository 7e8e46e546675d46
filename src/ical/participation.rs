//! Attendee participation state on an event.
//!
//! An attendee is addressed by email; the stored property value carries a
//! `MAILTO:` prefix which is stripped before any comparison. A participation
//! update touches the master event and every recurrence exception the
//! attendee appears on, uniformly.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::ical::document::{Component, Property, Vcalendar};

/// An attendee's RSVP state (iCalendar `PARTSTAT`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartStat {
    NeedsAction,
    Accepted,
    Declined,
    Tentative,
}

impl PartStat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartStat::NeedsAction => "NEEDS-ACTION",
            PartStat::Accepted => "ACCEPTED",
            PartStat::Declined => "DECLINED",
            PartStat::Tentative => "TENTATIVE",
        }
    }
}

impl fmt::Display for PartStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartStat {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_uppercase().as_str() {
            "NEEDS-ACTION" => Ok(PartStat::NeedsAction),
            "ACCEPTED" => Ok(PartStat::Accepted),
            "DECLINED" => Ok(PartStat::Declined),
            "TENTATIVE" => Ok(PartStat::Tentative),
            other => Err(Error::Parse(format!("unknown participation status {}", other))),
        }
    }
}

/// Strip the `MAILTO:` prefix (any case) off a cal-address value
pub fn strip_mailto(value: &str) -> &str {
    match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("MAILTO:") => &value[7..],
        _ => value,
    }
}

/// The attendee property matching `email` on one event component
pub fn find_attendee<'a>(event: &'a Component, email: &str) -> Option<&'a Property> {
    event
        .properties_named("ATTENDEE")
        .find(|prop| prop.value().map(strip_mailto) == Some(email))
}

/// Set the participation status of `email` on the master event and on every
/// recurrence exception it appears in.
///
/// Returns how many components were updated. Zero means the attendee is not
/// part of the event at all; callers treat that as a usage error rather
/// than a silent no-op.
pub fn apply_participation(calendar: &mut Vcalendar, email: &str, status: PartStat) -> usize {
    let mut matched = 0;

    for (index, event) in calendar.events_mut().enumerate() {
        if index > 0 && !event.is_recurrence_exception() {
            continue;
        }
        if let Some(attendee) = event
            .properties_named_mut("ATTENDEE")
            .find(|prop| prop.value().map(strip_mailto) == Some(email))
        {
            attendee.set_param("PARTSTAT", status.as_str());
            matched += 1;
        }
    }

    matched
}

/// Every attendee email of the master event
pub fn attendee_emails(ics: &str) -> Result<Vec<String>, Error> {
    let calendar = crate::ical::parser::parse(ics)?;
    let event = calendar.master_event()?;

    Ok(event
        .properties_named("ATTENDEE")
        .filter_map(|prop| prop.value())
        .map(|value| strip_mailto(value).to_string())
        .collect())
}

/// The organizer email of the master event, if the event has an organizer
pub fn organizer_email(ics: &str) -> Result<Option<String>, Error> {
    let calendar = crate::ical::parser::parse(ics)?;
    let event = calendar.master_event()?;

    Ok(event
        .property("ORGANIZER")
        .and_then(Property::value)
        .map(|value| strip_mailto(value).to_string()))
}
