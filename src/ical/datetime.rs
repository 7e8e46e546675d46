//! iCalendar date, date-time and duration values.
//!
//! A value keeps the flavour it had on the wire: date-only, floating,
//! UTC, or bound to a zone resolved from an embedded `VTIMEZONE`. Display
//! formatting depends on that flavour (a date-only value never grows a
//! time-of-day or a timezone label).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::Error;
use crate::ical::document::{Property, Vcalendar};

#[derive(Clone, Debug, PartialEq)]
pub enum CalDateTime {
    /// A date-only (all-day) value
    Date(NaiveDate),
    /// A local time with no zone attached
    Floating(NaiveDateTime),
    Utc(DateTime<Utc>),
    /// Bound to a zone resolved from the document's `VTIMEZONE`s
    Zoned(DateTime<Tz>),
}

impl CalDateTime {
    /// Interpret a `DTSTART`-like property, resolving its `TZID` parameter
    /// against the document's embedded timezones.
    pub fn from_property(calendar: &Vcalendar, property: &Property) -> Result<Self, Error> {
        let raw = property
            .value()
            .ok_or_else(|| Error::Parse(format!("{} carries no value", property.name)))?;
        let is_date = property
            .param("VALUE")
            .map(|v| v.eq_ignore_ascii_case("DATE"))
            .unwrap_or_else(|| !raw.contains('T'));
        let zone = property.param("TZID").and_then(|tzid| calendar.timezone(tzid));

        Self::parse(raw, is_date, zone)
    }

    pub fn parse(raw: &str, is_date: bool, zone: Option<Tz>) -> Result<Self, Error> {
        if is_date {
            let date = NaiveDate::parse_from_str(raw, "%Y%m%d")
                .map_err(|err| Error::Parse(format!("invalid date {}: {}", raw, err)))?;
            return Ok(CalDateTime::Date(date));
        }

        if let Some(stripped) = raw.strip_suffix('Z') {
            let naive = parse_naive(stripped)?;
            return Ok(CalDateTime::Utc(Utc.from_utc_datetime(&naive)));
        }

        let naive = parse_naive(raw)?;
        match zone {
            // An ambiguous local time (DST fold) resolves to its earliest
            // mapping, like the original's timezone binding did
            Some(tz) => match tz.from_local_datetime(&naive).earliest() {
                Some(zoned) => Ok(CalDateTime::Zoned(zoned)),
                None => Ok(CalDateTime::Floating(naive)),
            },
            None => Ok(CalDateTime::Floating(naive)),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, CalDateTime::Date(_))
    }

    fn naive(&self) -> NaiveDateTime {
        match self {
            CalDateTime::Date(date) => date.and_time(NaiveTime::MIN),
            CalDateTime::Floating(naive) => *naive,
            CalDateTime::Utc(utc) => utc.naive_utc(),
            CalDateTime::Zoned(zoned) => zoned.naive_local(),
        }
    }

    pub fn plus(&self, duration: Duration) -> CalDateTime {
        match self {
            CalDateTime::Date(date) => CalDateTime::Floating(date.and_time(NaiveTime::MIN) + duration),
            CalDateTime::Floating(naive) => CalDateTime::Floating(*naive + duration),
            CalDateTime::Utc(utc) => CalDateTime::Utc(*utc + duration),
            CalDateTime::Zoned(zoned) => CalDateTime::Zoned(zoned.clone() + duration),
        }
    }

    /// Shift by whole days. A date-only value stays date-only.
    pub fn plus_days(&self, days: i64) -> CalDateTime {
        match self {
            CalDateTime::Date(date) => CalDateTime::Date(*date + Duration::days(days)),
            other => other.plus(Duration::days(days)),
        }
    }

    pub fn minus_days(&self, days: i64) -> CalDateTime {
        self.plus_days(-days)
    }

    /// Whole days elapsed between two values, truncating toward zero
    pub fn days_until(&self, end: &CalDateTime) -> i64 {
        (end.naive() - self.naive()).num_days()
    }

    /// `06/12/2015`
    pub fn format_date(&self) -> String {
        self.naive().format("%m/%d/%Y").to_string()
    }

    /// `3:00 PM`, absent on date-only values
    pub fn format_time(&self) -> Option<String> {
        match self {
            CalDateTime::Date(_) => None,
            _ => Some(self.naive().format("%-I:%M %p").to_string()),
        }
    }

    /// Date and time on one line, for contexts that flatten the value
    pub fn format_full(&self) -> String {
        match self.format_time() {
            Some(time) => format!("{} {}", self.format_date(), time),
            None => self.format_date(),
        }
    }

    /// Timezone label shown next to the time: `UTC`, an IANA name, or
    /// nothing for date-only and floating values
    pub fn timezone_label(&self) -> Option<String> {
        match self {
            CalDateTime::Utc(_) => Some("UTC".to_string()),
            CalDateTime::Zoned(zoned) => Some(zoned.timezone().name().to_string()),
            _ => None,
        }
    }
}

fn parse_naive(raw: &str) -> Result<NaiveDateTime, Error> {
    NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S")
        .map_err(|err| Error::Parse(format!("invalid date-time {}: {}", raw, err)))
}

/// Parse an RFC 5545 duration value (`-PT15M`, `P1DT12H`, `P2W`...)
pub fn parse_ical_duration(raw: &str) -> Result<Duration, Error> {
    let trimmed = raw.trim();
    let (sign, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let body = body
        .strip_prefix('P')
        .ok_or_else(|| Error::Parse(format!("invalid duration {}", raw)))?;

    let mut seconds: i64 = 0;
    let mut digits = String::new();
    let mut in_time = false;

    for ch in body.chars() {
        match ch {
            'T' | 't' => {
                in_time = true;
                digits.clear();
            }
            '0'..='9' => digits.push(ch),
            'W' | 'D' | 'H' | 'M' | 'S' | 'w' | 'd' | 'h' | 'm' | 's' => {
                let count: i64 = digits
                    .parse()
                    .map_err(|_| Error::Parse(format!("invalid duration {}", raw)))?;
                digits.clear();
                let unit = match ch.to_ascii_uppercase() {
                    'W' => 7 * 86_400,
                    'D' => 86_400,
                    'H' => 3_600,
                    'M' if in_time => 60,
                    'S' => 1,
                    // A month designator is not a valid RFC 5545 duration unit
                    _ => return Err(Error::Parse(format!("invalid duration {}", raw))),
                };
                seconds += count * unit;
            }
            _ => return Err(Error::Parse(format!("invalid duration {}", raw))),
        }
    }

    Ok(Duration::seconds(sign * seconds))
}
