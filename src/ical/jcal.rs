//! jCal (RFC 7265) serialization of a calendar document.
//!
//! jCal is the wire body of every write against the DAV server: a property
//! becomes `[name, {params}, type, value...]`, a component becomes
//! `[name, [properties], [subcomponents]]`, and date/date-time/offset
//! values are re-expressed in extended form.

use serde_json::{json, Map, Value};

use crate::ical::document::{Component, Property, Vcalendar};

pub fn to_jcal(calendar: &Vcalendar) -> Value {
    component_to_jcal(&calendar.root)
}

fn component_to_jcal(component: &Component) -> Value {
    let properties: Vec<Value> = component.properties.iter().map(property_to_jcal).collect();
    let subcomponents: Vec<Value> =
        component.subcomponents.iter().map(component_to_jcal).collect();

    json!([component.name.to_lowercase(), properties, subcomponents])
}

fn property_to_jcal(property: &Property) -> Value {
    let name = property.name.to_lowercase();
    let raw = property.value().unwrap_or("");

    // An explicit VALUE parameter becomes the type slot and is dropped from
    // the parameter object (RFC 7265 §3.4)
    let value_type = match property.param("VALUE") {
        Some(explicit) => explicit.to_lowercase(),
        None => default_value_type(&name, raw).to_string(),
    };

    let mut params = Map::new();
    for (key, values) in &property.params {
        if key.eq_ignore_ascii_case("VALUE") {
            continue;
        }
        let entry = match values.len() {
            0 => Value::String(String::new()),
            1 => Value::String(values[0].clone()),
            _ => Value::Array(values.iter().cloned().map(Value::String).collect()),
        };
        params.insert(key.to_lowercase(), entry);
    }

    let mut slots =
        vec![Value::String(name.clone()), Value::Object(params), Value::String(value_type.clone())];
    for piece in split_values(&name, raw) {
        slots.push(typed_value(&value_type, piece));
    }

    Value::Array(slots)
}

/// Properties that may carry a comma-separated value list get one jCal
/// value slot per entry
fn split_values<'a>(name: &str, raw: &'a str) -> Vec<&'a str> {
    match name {
        "exdate" | "rdate" | "categories" => raw.split(',').collect(),
        _ => vec![raw],
    }
}

fn default_value_type(name: &str, raw: &str) -> &'static str {
    match name {
        "dtstart" | "dtend" | "dtstamp" | "due" | "completed" | "created" | "last-modified"
        | "recurrence-id" | "exdate" | "rdate" => {
            if raw.contains('T') {
                "date-time"
            } else {
                "date"
            }
        }
        // An absolute TRIGGER is a date-time, the usual relative one a
        // duration
        "trigger" => {
            if raw.trim_start_matches(['-', '+'].as_ref()).starts_with('P') {
                "duration"
            } else {
                "date-time"
            }
        }
        "duration" | "refresh-interval" => "duration",
        "sequence" | "priority" | "repeat" | "percent-complete" => "integer",
        "attendee" | "organizer" => "cal-address",
        "tzoffsetfrom" | "tzoffsetto" => "utc-offset",
        "url" | "tzurl" => "uri",
        "rrule" | "exrule" => "recur",
        "freebusy" => "period",
        _ => "text",
    }
}

fn typed_value(value_type: &str, raw: &str) -> Value {
    match value_type {
        "integer" => match raw.parse::<i64>() {
            Ok(number) => json!(number),
            Err(_) => Value::String(raw.to_string()),
        },
        "float" => match raw.parse::<f64>() {
            Ok(number) => json!(number),
            Err(_) => Value::String(raw.to_string()),
        },
        "boolean" => Value::Bool(raw.eq_ignore_ascii_case("TRUE")),
        "date" => Value::String(expand_date(raw)),
        "date-time" => Value::String(expand_date_time(raw)),
        "utc-offset" => Value::String(expand_utc_offset(raw)),
        "recur" => recur_value(raw),
        _ => Value::String(raw.to_string()),
    }
}

/// `20150612` -> `2015-06-12`
fn expand_date(raw: &str) -> String {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
    } else {
        raw.to_string()
    }
}

/// `20150612T150000Z` -> `2015-06-12T15:00:00Z`
fn expand_date_time(raw: &str) -> String {
    let (body, suffix) = match raw.strip_suffix('Z') {
        Some(body) => (body, "Z"),
        None => (raw, ""),
    };
    if body.len() == 15 && body.as_bytes()[8] == b'T' {
        format!(
            "{}-{}-{}T{}:{}:{}{}",
            &body[0..4],
            &body[4..6],
            &body[6..8],
            &body[9..11],
            &body[11..13],
            &body[13..15],
            suffix
        )
    } else {
        raw.to_string()
    }
}

/// `+0200` -> `+02:00`, `-053000` -> `-05:30:00`
fn expand_utc_offset(raw: &str) -> String {
    let (sign, digits) = match raw.split_at(raw.len().min(1)) {
        (s @ "+", rest) | (s @ "-", rest) => (s, rest),
        _ => ("", raw),
    };
    match digits.len() {
        4 => format!("{}{}:{}", sign, &digits[0..2], &digits[2..4]),
        6 => format!("{}{}:{}:{}", sign, &digits[0..2], &digits[2..4], &digits[4..6]),
        _ => raw.to_string(),
    }
}

/// `FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU` -> `{"freq": "YEARLY", ...}`
fn recur_value(raw: &str) -> Value {
    let mut map = Map::new();
    for part in raw.split(';').filter(|part| !part.is_empty()) {
        let mut pieces = part.splitn(2, '=');
        let key = pieces.next().unwrap_or("").to_lowercase();
        let value = pieces.next().unwrap_or("");

        let converted: Vec<Value> = value
            .split(',')
            .map(|item| match item.parse::<i64>() {
                Ok(number) => json!(number),
                Err(_) => Value::String(item.to_string()),
            })
            .collect();

        let entry = if converted.len() == 1 {
            converted.into_iter().next().unwrap_or(Value::Null)
        } else {
            Value::Array(converted)
        };
        map.insert(key, entry);
    }
    Value::Object(map)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ical::parser::parse;

    const RECURRING_ICAL: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
BEGIN:VEVENT
UID:recurring-1
SEQUENCE:2
DTSTART;TZID=Europe/Paris:20150612T150000
DTEND;TZID=Europe/Paris:20150612T153000
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU
EXDATE:20160612T150000,20170612T150000
SUMMARY:Weekly sync
ORGANIZER;CN=John Doe:MAILTO:johndoe@open-paas.org
ATTENDEE;PARTSTAT=ACCEPTED;CN=Jane Doe:MAILTO:janedoe@open-paas.org
END:VEVENT
END:VCALENDAR
"#;

    fn find_property<'a>(jcal: &'a Value, name: &str) -> &'a Value {
        jcal[1]
            .as_array()
            .unwrap()
            .iter()
            .find(|prop| prop[0] == name)
            .unwrap_or_else(|| panic!("no {} property", name))
    }

    #[test]
    fn test_component_shape() {
        let calendar = parse(RECURRING_ICAL).unwrap();
        let jcal = to_jcal(&calendar);

        assert_eq!(jcal[0], "vcalendar");
        let events = jcal[2].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0][0], "vevent");
    }

    #[test]
    fn test_property_typing() {
        let calendar = parse(RECURRING_ICAL).unwrap();
        let jcal = to_jcal(&calendar);
        let event = &jcal[2][0];

        let sequence = find_property(event, "sequence");
        assert_eq!(sequence[2], "integer");
        assert_eq!(sequence[3], 2);

        let dtstart = find_property(event, "dtstart");
        assert_eq!(dtstart[1]["tzid"], "Europe/Paris");
        assert_eq!(dtstart[2], "date-time");
        assert_eq!(dtstart[3], "2015-06-12T15:00:00");

        let attendee = find_property(event, "attendee");
        assert_eq!(attendee[1]["partstat"], "ACCEPTED");
        assert_eq!(attendee[2], "cal-address");
        assert_eq!(attendee[3], "MAILTO:janedoe@open-paas.org");
    }

    #[test]
    fn test_recur_and_multi_values() {
        let calendar = parse(RECURRING_ICAL).unwrap();
        let jcal = to_jcal(&calendar);
        let event = &jcal[2][0];

        let rrule = find_property(event, "rrule");
        assert_eq!(rrule[2], "recur");
        assert_eq!(rrule[3]["freq"], "YEARLY");
        assert_eq!(rrule[3]["bymonth"], 3);
        assert_eq!(rrule[3]["byday"], "-1SU");

        let exdate = find_property(event, "exdate");
        assert_eq!(exdate[3], "2016-06-12T15:00:00");
        assert_eq!(exdate[4], "2017-06-12T15:00:00");
    }

    #[test]
    fn test_utc_offset_expansion() {
        assert_eq!(expand_utc_offset("+0200"), "+02:00");
        assert_eq!(expand_utc_offset("-053000"), "-05:30:00");
        assert_eq!(expand_utc_offset("0200"), "02:00");
    }
}
