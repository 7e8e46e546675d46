//! This module provides a client to talk to the calendar storage (DAV)
//! server.
//!
//! Every operation resolves the acting user's access token and the server
//! endpoint first, then issues one HTTP call and interprets the response.
//! Nothing is cached between calls: two operations for the same user each
//! resolve their own token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use minidom::Element;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::Error;
use crate::resource::{CalendarDescriptor, FetchedEvent, MultigetEvent};
use crate::settings::{DEFAULT_CALENDAR_NAME, DEFAULT_CALENDAR_URI, TOKEN_HEADER};
use crate::traits::{EndpointSource, EventStore, TokenSource};
use crate::xml::{find_elem, find_elems};

/// A calendar-multiget REPORT asking for the ETag and data of every listed
/// resource
fn multiget_body(paths: &[String]) -> String {
    let hrefs: String =
        paths.iter().map(|path| format!("<D:href>{}</D:href>", path)).collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<C:calendar-multiget xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop>
    <D:getetag/>
    <C:calendar-data/>
  </D:prop>
  {}
</C:calendar-multiget>"#,
        hrefs
    )
}

/// Path of one event resource, or of a broader listing when trailing
/// segments are omitted: a calendar without an event addresses the
/// calendar's own `.json` representation, a bare user addresses the
/// calendar-home level.
fn event_path(user_id: &str, calendar_uri: Option<&str>, event_uid: Option<&str>) -> String {
    match (calendar_uri, event_uid) {
        (Some(calendar), Some(uid)) => format!("calendars/{}/{}/{}.ics", user_id, calendar, uid),
        (Some(calendar), None) => format!("calendars/{}/{}.json", user_id, calendar),
        (None, _) => format!("calendars/{}", user_id),
    }
}

fn resolve_url(endpoint: &Url, path: &str) -> String {
    format!("{}/{}", endpoint.as_str().trim_end_matches('/'), path)
}

/// DAV transport client for the calendar storage server
pub struct CaldavClient {
    tokens: Arc<dyn TokenSource>,
    endpoints: Arc<dyn EndpointSource>,
}

impl CaldavClient {
    /// Create a client. This does not start a connection.
    pub fn new(tokens: Arc<dyn TokenSource>, endpoints: Arc<dyn EndpointSource>) -> Self {
        Self { tokens, endpoints }
    }

    /// Resolve the access token, then the server endpoint
    async fn locate(&self, user_id: &str) -> Result<(String, Url), Error> {
        let token = self.tokens.new_token(user_id).await?;
        let endpoint = self.endpoints.dav_endpoint().await?;
        Ok((token, endpoint))
    }

    /// Fetch one stored event (both trailing segments given), a calendar
    /// representation (`event_uid` omitted) or the calendar-home listing
    /// (only `user_id` given), together with the observed ETag.
    pub async fn get_event(
        &self,
        user_id: &str,
        calendar_uri: Option<&str>,
        event_uid: Option<&str>,
    ) -> Result<FetchedEvent, Error> {
        let (token, endpoint) = self.locate(user_id).await?;
        let url = resolve_url(&endpoint, &event_path(user_id, calendar_uri, event_uid));
        log::debug!("Fetching event at {}", url);

        let response =
            reqwest::Client::new().get(&url).header(TOKEN_HEADER, token.as_str()).send().await?;
        if !response.status().is_success() {
            return Err(Error::unexpected_status(response.status().as_u16()));
        }

        let etag = response
            .headers()
            .get("ETag")
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let ical = response.text().await?;

        Ok(FetchedEvent { ical, etag })
    }

    pub async fn get_event_in_default_calendar(
        &self,
        user_id: &str,
        event_uid: &str,
    ) -> Result<FetchedEvent, Error> {
        self.get_event(user_id, Some(DEFAULT_CALENDAR_URI), Some(event_uid)).await
    }

    /// Overwrite one stored event with a jCal body, unconditionally
    pub async fn store_event(
        &self,
        user_id: &str,
        calendar_uri: &str,
        event_uid: &str,
        jcal: &Value,
    ) -> Result<(), Error> {
        self.put_event(user_id, calendar_uri, event_uid, jcal, None).await
    }

    pub async fn store_event_in_default_calendar(
        &self,
        user_id: &str,
        event_uid: &str,
        jcal: &Value,
    ) -> Result<(), Error> {
        self.store_event(user_id, DEFAULT_CALENDAR_URI, event_uid, jcal).await
    }

    async fn put_event(
        &self,
        user_id: &str,
        calendar_uri: &str,
        event_uid: &str,
        jcal: &Value,
        etag: Option<&str>,
    ) -> Result<(), Error> {
        let (token, endpoint) = self.locate(user_id).await?;
        let url =
            resolve_url(&endpoint, &event_path(user_id, Some(calendar_uri), Some(event_uid)));
        log::debug!("Storing event at {}", url);

        let mut request = reqwest::Client::new().put(&url).header(TOKEN_HEADER, token.as_str()).json(jcal);
        if let Some(etag) = etag {
            request = request.header("If-Match", etag);
        }

        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::PRECONDITION_FAILED => Err(Error::Conflict),
            status => Err(Error::unexpected_status(status.as_u16())),
        }
    }

    pub async fn delete_event(
        &self,
        user_id: &str,
        calendar_uri: &str,
        event_uid: &str,
    ) -> Result<(), Error> {
        let (token, endpoint) = self.locate(user_id).await?;
        let url =
            resolve_url(&endpoint, &event_path(user_id, Some(calendar_uri), Some(event_uid)));
        log::debug!("Deleting event at {}", url);

        let response =
            reqwest::Client::new().delete(&url).header(TOKEN_HEADER, token.as_str()).send().await?;
        if !response.status().is_success() {
            return Err(Error::unexpected_status(response.status().as_u16()));
        }
        Ok(())
    }

    pub async fn delete_event_in_default_calendar(
        &self,
        user_id: &str,
        event_uid: &str,
    ) -> Result<(), Error> {
        self.delete_event(user_id, DEFAULT_CALENDAR_URI, event_uid).await
    }

    /// Synthesize a minimal one-hour event and store it in the user's
    /// default calendar. Returns the generated UID.
    pub async fn create_event_in_default_calendar(
        &self,
        user_id: &str,
        summary: &str,
        location: &str,
        start: DateTime<Utc>,
    ) -> Result<String, Error> {
        let uid = uuid::Uuid::new_v4().to_hyphenated().to_string();
        let dtstart = start.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let dtend = (start + Duration::hours(1)).format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let jcal = json!([
            "vcalendar",
            [],
            [[
                "vevent",
                [
                    ["uid", {}, "text", uid.as_str()],
                    ["summary", {}, "text", summary],
                    ["location", {}, "text", location],
                    ["dtstart", {}, "date-time", dtstart],
                    ["dtend", {}, "date-time", dtend]
                ],
                []
            ]]
        ]);

        self.store_event_in_default_calendar(user_id, &uid, &jcal).await?;
        Ok(uid)
    }

    /// Issue a scheduling (iTIP) request on behalf of the user and return
    /// the raw response body.
    pub async fn itip_request(&self, user_id: &str, jcal: &Value) -> Result<String, Error> {
        let (token, endpoint) = self.locate(user_id).await?;
        let url = resolve_url(&endpoint, &format!("calendars/{}", user_id));
        let method = Method::from_bytes(b"ITIP").expect("cannot create ITIP method.");

        let response = reqwest::Client::new()
            .request(method, &url)
            .header(TOKEN_HEADER, token.as_str())
            .json(jcal)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::unexpected_status(response.status().as_u16()));
        }

        Ok(response.text().await?)
    }

    /// List the user's calendars from the calendar-home level.
    /// Resolves to an empty list when the response embeds no collection.
    pub async fn get_calendar_list(&self, user_id: &str) -> Result<Vec<CalendarDescriptor>, Error> {
        let (token, endpoint) = self.locate(user_id).await?;
        let url = resolve_url(&endpoint, &format!("calendars/{}", user_id));

        let response = reqwest::Client::new()
            .get(&url)
            .header(TOKEN_HEADER, token.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::unexpected_status(response.status().as_u16()));
        }

        let body: CalendarHomeBody = response.json().await?;
        Ok(map_calendar_home(body))
    }

    /// Fetch several stored events in one REPORT. Entries whose per-item
    /// status is not a success are dropped from the result, not surfaced:
    /// this is a best-effort bulk fetch.
    pub async fn get_multiple_events_from_paths(
        &self,
        user_id: &str,
        paths: &[String],
    ) -> Result<Vec<MultigetEvent>, Error> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let (token, endpoint) = self.locate(user_id).await?;
        let url = resolve_url(&endpoint, "calendars");
        let method = Method::from_bytes(b"REPORT").expect("cannot create REPORT method.");

        let response = reqwest::Client::new()
            .request(method, &url)
            .header(TOKEN_HEADER, token.as_str())
            .header(CONTENT_TYPE, "application/xml")
            .header(ACCEPT, "application/xml")
            .body(multiget_body(paths))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::unexpected_status(response.status().as_u16()));
        }

        let text = response.text().await?;
        parse_multistatus(&text)
    }
}

#[async_trait]
impl EventStore for CaldavClient {
    async fn get_event(
        &self,
        user_id: &str,
        calendar_uri: Option<&str>,
        event_uid: Option<&str>,
    ) -> Result<FetchedEvent, Error> {
        CaldavClient::get_event(self, user_id, calendar_uri, event_uid).await
    }

    async fn store_event_if_match(
        &self,
        user_id: &str,
        calendar_uri: &str,
        event_uid: &str,
        jcal: &Value,
        etag: Option<&str>,
    ) -> Result<(), Error> {
        self.put_event(user_id, calendar_uri, event_uid, jcal, etag).await
    }
}

#[derive(Deserialize)]
struct CalendarHomeBody {
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedCalendars>,
}

#[derive(Deserialize)]
struct EmbeddedCalendars {
    #[serde(rename = "dav:calendar", default)]
    calendars: Vec<CalendarChild>,
}

#[derive(Deserialize)]
struct CalendarChild {
    #[serde(rename = "_links")]
    links: ChildLinks,
    #[serde(rename = "dav:name")]
    name: Option<String>,
    #[serde(rename = "caldav:description")]
    description: Option<String>,
    #[serde(rename = "apple:color")]
    color: Option<String>,
}

#[derive(Deserialize)]
struct ChildLinks {
    #[serde(rename = "self")]
    own: ChildLink,
}

#[derive(Deserialize)]
struct ChildLink {
    href: String,
}

fn map_calendar_home(body: CalendarHomeBody) -> Vec<CalendarDescriptor> {
    let children = match body.embedded {
        Some(embedded) => embedded.calendars,
        None => return Vec::new(),
    };

    children
        .into_iter()
        .map(|child| {
            let href = child.links.own.href;
            let uri = href.strip_suffix(".json").unwrap_or(&href).to_string();
            let id = uri.rsplit('/').next().unwrap_or("").to_string();

            // The legacy default calendar is always presented under its
            // well-known name, whatever the server has on record
            let name = if id == DEFAULT_CALENDAR_URI {
                Some(DEFAULT_CALENDAR_NAME.to_string())
            } else {
                child.name
            };

            CalendarDescriptor { id, uri, name, description: child.description, color: child.color }
        })
        .collect()
}

fn parse_multistatus(xml: &str) -> Result<Vec<MultigetEvent>, Error> {
    let root: Element = xml.parse()?;
    let mut events = Vec::new();

    for response in find_elems(&root, "response") {
        let path = match find_elem(response, "href") {
            Some(href) => href.text(),
            None => {
                log::warn!("Multiget response entry carries no href, ignoring it");
                continue;
            }
        };

        let ok = find_elem(response, "status")
            .map(|status| status.text().contains("200"))
            .unwrap_or(false);
        if !ok {
            log::debug!("Dropping multiget entry {} (per-item status is not a success)", path);
            continue;
        }

        let etag = find_elem(response, "getetag").map(|el| el.text());
        let ical = find_elem(response, "calendar-data").map(|el| el.text());
        match (etag, ical) {
            (Some(etag), Some(ical)) => events.push(MultigetEvent { path, etag, ical }),
            _ => log::warn!("Multiget entry {} has no etag or data, ignoring it", path),
        }
    }

    Ok(events)
}
