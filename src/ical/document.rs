//! In-memory calendar document model.
//!
//! A parsed document is a plain tree of value-like nodes: components owning
//! properties and subcomponents. The reconciliation workflow mutates a
//! workflow-local copy of this tree and throws it away after every write
//! attempt, so nothing here is shared or aliased.

use std::collections::HashMap;

use chrono_tz::Tz;

use crate::error::Error;

/// One content line: `NAME;PARAM=VALUE:value`
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    /// Property name, kept uppercase as parsed
    pub name: String,
    /// Parameters in document order. A parameter may carry several values.
    pub params: Vec<(String, Vec<String>)>,
    pub value: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), params: Vec::new(), value: Some(value.into()) }
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// First value of the named parameter, if present
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Replace the named parameter, or append it if absent
    pub fn set_param(&mut self, name: &str, value: &str) {
        match self.params.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some((_, values)) => *values = vec![value.to_string()],
            None => self.params.push((name.to_uppercase(), vec![value.to_string()])),
        }
    }
}

/// A component (`VCALENDAR`, `VEVENT`, `VALARM`...) of the document tree
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    /// Component name, kept uppercase
    pub name: String,
    pub properties: Vec<Property>,
    pub subcomponents: Vec<Component>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), properties: Vec::new(), subcomponents: Vec::new() }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn property_value(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(Property::value)
    }

    pub fn properties_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Property> + 'a {
        self.properties.iter().filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn properties_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Property> + 'a {
        self.properties.iter_mut().filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn subcomponent(&self, name: &str) -> Option<&Component> {
        self.subcomponents.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn subcomponents_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Component> + 'a {
        self.subcomponents.iter().filter(move |c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn subcomponents_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Component> + 'a {
        self.subcomponents.iter_mut().filter(move |c| c.name.eq_ignore_ascii_case(name))
    }

    /// Whether this event component overrides one occurrence of a recurring
    /// series
    pub fn is_recurrence_exception(&self) -> bool {
        self.property("RECURRENCE-ID").is_some()
    }
}

/// A whole parsed `VCALENDAR`, with its embedded timezone definitions
/// resolved to real zones.
#[derive(Clone, Debug)]
pub struct Vcalendar {
    pub root: Component,
    timezones: HashMap<String, Tz>,
}

impl Vcalendar {
    pub(crate) fn new(root: Component, timezones: HashMap<String, Tz>) -> Self {
        Self { root, timezones }
    }

    /// All `VEVENT` subcomponents, master first when the document is a
    /// recurring series with exceptions
    pub fn events(&self) -> impl Iterator<Item = &Component> {
        self.root.subcomponents_named("VEVENT")
    }

    pub fn events_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.root.subcomponents_named_mut("VEVENT")
    }

    /// The first `VEVENT` of the document
    pub fn master_event(&self) -> Result<&Component, Error> {
        self.events()
            .next()
            .ok_or_else(|| Error::Parse("calendar object contains no VEVENT".to_string()))
    }

    /// The zone a `TZID` parameter refers to, when the embedded `VTIMEZONE`
    /// could be resolved against the IANA database
    pub fn timezone(&self, tzid: &str) -> Option<Tz> {
        self.timezones.get(tzid).copied()
    }

    /// Serialize the document to its jCal (RFC 7265) representation
    pub fn to_jcal(&self) -> serde_json::Value {
        crate::ical::jcal::to_jcal(self)
    }
}
