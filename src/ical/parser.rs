//! Parsing of raw iCalendar text into the document model

use std::collections::HashMap;

use chrono_tz::Tz;
use ical::parser::ical::component::{
    IcalAlarm, IcalCalendar, IcalEvent, IcalTimeZone, IcalTimeZoneTransitionType,
};

use crate::error::Error;
use crate::ical::document::{Component, Property, Vcalendar};

/// Parse one iCalendar document.
///
/// Embedded `VTIMEZONE` definitions are resolved against the IANA database
/// and bound to the document, so that later date formatting reflects the
/// event's zone instead of a floating or UTC default. A `TZID` that does not
/// name an IANA zone is left unresolved (its values stay floating).
pub fn parse(content: &str) -> Result<Vcalendar, Error> {
    let mut reader = ical::IcalParser::new(content.as_bytes());
    let calendar = match reader.next() {
        None => return Err(Error::Parse("input contains no calendar object".to_string())),
        Some(Err(err)) => return Err(Error::Parse(format!("invalid iCalendar data: {}", err))),
        Some(Ok(calendar)) => calendar,
    };

    if reader.next().map(|more| more.is_ok()) == Some(true) {
        return Err(Error::Parse("multiple calendar objects are not supported".to_string()));
    }

    Ok(build_document(calendar))
}

fn build_document(calendar: IcalCalendar) -> Vcalendar {
    let mut timezones = HashMap::new();
    for timezone in &calendar.timezones {
        if let Some(tzid) = timezone
            .properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case("TZID"))
            .and_then(|p| p.value.clone())
        {
            match tzid.parse::<Tz>() {
                Ok(zone) => {
                    timezones.insert(tzid, zone);
                }
                Err(_) => log::debug!("TZID {} is not an IANA zone, leaving it unresolved", tzid),
            }
        }
    }

    let mut root = Component::new("VCALENDAR");
    root.properties = convert_properties(calendar.properties);

    for timezone in calendar.timezones {
        root.subcomponents.push(convert_timezone(timezone));
    }
    for event in calendar.events {
        root.subcomponents.push(convert_event(event));
    }
    for todo in calendar.todos {
        let mut component = Component::new("VTODO");
        component.properties = convert_properties(todo.properties);
        for alarm in todo.alarms {
            component.subcomponents.push(convert_alarm(alarm));
        }
        root.subcomponents.push(component);
    }
    for journal in calendar.journals {
        let mut component = Component::new("VJOURNAL");
        component.properties = convert_properties(journal.properties);
        root.subcomponents.push(component);
    }
    for free_busy in calendar.free_busys {
        let mut component = Component::new("VFREEBUSY");
        component.properties = convert_properties(free_busy.properties);
        root.subcomponents.push(component);
    }

    Vcalendar::new(root, timezones)
}

fn convert_event(event: IcalEvent) -> Component {
    let mut component = Component::new("VEVENT");
    component.properties = convert_properties(event.properties);
    for alarm in event.alarms {
        component.subcomponents.push(convert_alarm(alarm));
    }
    component
}

fn convert_alarm(alarm: IcalAlarm) -> Component {
    let mut component = Component::new("VALARM");
    component.properties = convert_properties(alarm.properties);
    component
}

fn convert_timezone(timezone: IcalTimeZone) -> Component {
    let mut component = Component::new("VTIMEZONE");
    component.properties = convert_properties(timezone.properties);
    for transition in timezone.transitions {
        let name = match transition.transition {
            IcalTimeZoneTransitionType::STANDARD => "STANDARD",
            IcalTimeZoneTransitionType::DAYLIGHT => "DAYLIGHT",
        };
        let mut sub = Component::new(name);
        sub.properties = convert_properties(transition.properties);
        component.subcomponents.push(sub);
    }
    component
}

fn convert_properties(properties: Vec<ical::property::Property>) -> Vec<Property> {
    properties
        .into_iter()
        .map(|p| Property { name: p.name, params: p.params.unwrap_or_default(), value: p.value })
        .collect()
}
