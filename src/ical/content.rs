//! Presentation-ready view of an event.
//!
//! Flattens a parsed calendar object into the structure the notification
//! templates and consultation views consume: formatted dates, the attendee
//! roster split from booked resources, the organizer with an avatar URL,
//! and the alarm if the event carries one.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Error;
use crate::ical::datetime::{parse_ical_duration, CalDateTime};
use crate::ical::document::{Component, Vcalendar};
use crate::ical::parser::parse;
use crate::ical::participation::strip_mailto;

#[derive(Clone, Debug, Serialize)]
pub struct EventDate {
    pub date: String,
    pub time: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrganizerContent {
    pub cn: Option<String>,
    pub email: String,
    pub avatar: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AttendeeContent {
    pub cn: Option<String>,
    pub partstat: Option<String>,
}

/// Read-only view of a `VALARM`, anchored on the event's start date
#[derive(Clone, Debug, Serialize)]
pub struct AlarmDescriptor {
    pub action: Option<String>,
    pub trigger: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    /// Start date shifted by the trigger offset
    pub due_date: String,
    /// The trigger offset spelled out for humans
    pub trigger_display: String,
    /// Target of an EMAIL alarm, raw and with the MAILTO: prefix stripped
    pub attendee: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EventContent {
    pub method: Option<String>,
    pub uid: Option<String>,
    pub sequence: Option<i64>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub all_day: bool,
    pub start: EventDate,
    pub end: EventDate,
    pub duration_in_days: i64,
    pub organizer: Option<OrganizerContent>,
    pub attendees: BTreeMap<String, AttendeeContent>,
    pub resources: BTreeMap<String, AttendeeContent>,
    pub has_resources: bool,
    pub alarm: Option<AlarmDescriptor>,
}

/// Flatten an ICS document into display content.
///
/// The end date of an all-day event is stored exclusive but displayed
/// inclusive: a two-day event ending "on the 3rd" on the wire is shown as
/// ending on the 2nd, and `duration_in_days` measures against the displayed
/// end.
pub fn event_content(ics: &str, base_url: &str) -> Result<EventContent, Error> {
    let calendar = parse(ics)?;
    let event = calendar.master_event()?;

    let dtstart_prop = event
        .property("DTSTART")
        .ok_or_else(|| Error::Parse("event has no DTSTART".to_string()))?;
    let dtstart = CalDateTime::from_property(&calendar, dtstart_prop)?;
    let all_day = dtstart.is_date();
    let dtend = event_end(&calendar, event, &dtstart)?;

    let start = EventDate {
        date: dtstart.format_date(),
        time: dtstart.format_time(),
        timezone: dtstart.timezone_label(),
    };
    let (end, duration_in_days) = if all_day {
        let display_end = dtend.minus_days(1);
        let duration = dtstart.days_until(&display_end);
        (EventDate { date: display_end.format_date(), time: None, timezone: None }, duration)
    } else {
        let duration = dtstart.days_until(&dtend);
        let end = EventDate {
            date: dtend.format_date(),
            time: dtend.format_time(),
            timezone: dtend.timezone_label().or_else(|| dtstart.timezone_label()),
        };
        (end, duration)
    };

    let mut attendees = BTreeMap::new();
    let mut resources = BTreeMap::new();
    for attendee in event.properties_named("ATTENDEE") {
        let email = match attendee.value() {
            Some(value) => strip_mailto(value).to_string(),
            None => continue,
        };
        let record = AttendeeContent {
            cn: attendee.param("CN").map(str::to_string),
            partstat: attendee.param("PARTSTAT").map(str::to_string),
        };
        let is_resource =
            attendee.param("CUTYPE").map(|c| c.eq_ignore_ascii_case("RESOURCE")).unwrap_or(false);
        if is_resource {
            resources.insert(email, record);
        } else {
            attendees.insert(email, record);
        }
    }

    let organizer = event.property("ORGANIZER").and_then(|prop| {
        prop.value().map(|value| {
            let email = strip_mailto(value).to_string();
            OrganizerContent {
                cn: prop.param("CN").map(str::to_string),
                avatar: avatar_url(base_url, &email),
                email,
            }
        })
    });

    let alarm = match event.subcomponent("VALARM") {
        Some(valarm) => Some(alarm_descriptor(valarm, &dtstart)?),
        None => None,
    };

    Ok(EventContent {
        method: calendar.root.property_value("METHOD").map(str::to_string),
        uid: event.property_value("UID").map(str::to_string),
        sequence: event.property_value("SEQUENCE").and_then(|raw| raw.parse().ok()),
        summary: event.property_value("SUMMARY").map(str::to_string),
        location: event.property_value("LOCATION").map(str::to_string),
        description: event.property_value("DESCRIPTION").map(str::to_string),
        comment: event.property_value("COMMENT").map(str::to_string),
        all_day,
        start,
        end,
        duration_in_days,
        organizer,
        has_resources: !resources.is_empty(),
        attendees,
        resources,
        alarm,
    })
}

/// End of the event, with the iCalendar fallbacks: an absent DTEND means
/// DTSTART plus DURATION, and failing that the start itself (the next day
/// for all-day events, keeping the exclusive-end convention).
fn event_end(
    calendar: &Vcalendar,
    event: &Component,
    dtstart: &CalDateTime,
) -> Result<CalDateTime, Error> {
    if let Some(prop) = event.property("DTEND") {
        return CalDateTime::from_property(calendar, prop);
    }
    if let Some(duration) = event.property_value("DURATION") {
        return Ok(dtstart.plus(parse_ical_duration(duration)?));
    }
    if dtstart.is_date() {
        return Ok(dtstart.plus_days(1));
    }
    Ok(dtstart.clone())
}

fn alarm_descriptor(valarm: &Component, dtstart: &CalDateTime) -> Result<AlarmDescriptor, Error> {
    let trigger = valarm
        .property_value("TRIGGER")
        .ok_or_else(|| Error::Parse("VALARM carries no TRIGGER".to_string()))?;
    let offset = parse_ical_duration(trigger)?;
    let due_date = dtstart.plus(offset);
    let trigger_display = humanize_offset(&offset);

    let action = valarm.property_value("ACTION").map(str::to_string);
    let (attendee, email) = if action.as_deref() == Some("EMAIL") {
        let attendee = valarm.property_value("ATTENDEE").map(str::to_string);
        let email = attendee.as_deref().map(|a| strip_mailto(a).to_string());
        (attendee, email)
    } else {
        (None, None)
    };

    Ok(AlarmDescriptor {
        action,
        trigger: trigger.to_string(),
        description: valarm.property_value("DESCRIPTION").map(str::to_string),
        summary: valarm.property_value("SUMMARY").map(str::to_string),
        due_date: due_date.format_full(),
        trigger_display,
        attendee,
        email,
    })
}

fn humanize_offset(offset: &chrono::Duration) -> String {
    let seconds = offset.num_seconds().unsigned_abs();
    humantime::format_duration(std::time::Duration::from_secs(seconds)).to_string()
}

fn avatar_url(base_url: &str, email: &str) -> String {
    format!("{}/api/avatars?objectType=user&email={}", base_url.trim_end_matches('/'), email)
}
