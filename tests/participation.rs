//! End-to-end participation scenarios over an in-memory DAV store.
//!
//! The store hands out an ETag with every fetch and only accepts a
//! conditional write carrying the current one; scripted "concurrent
//! writers" bump the ETag underneath the workflow to exercise the conflict
//! path the way a real server would.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use caldav_rsvp::action::{ActionOutcome, ParticipationAction};
use caldav_rsvp::error::Error;
use caldav_rsvp::reconcile::{reconcile_participation, ParticipationRequest};
use caldav_rsvp::resource::FetchedEvent;
use caldav_rsvp::traits::{Account, AccountDirectory, ConfigSource, EventStore, LinkBuilder};
use caldav_rsvp::PartStat;

const RECURRING_MEETING: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
BEGIN:VEVENT
UID:weekly-1
SEQUENCE:1
DTSTART:20160606T090000Z
DTEND:20160606T093000Z
RRULE:FREQ=WEEKLY;COUNT=10
SUMMARY:Weekly review
ORGANIZER;CN=John Doe:MAILTO:johndoe@open-paas.org
ATTENDEE;PARTSTAT=NEEDS-ACTION;CN=Jane Doe:MAILTO:janedoe@open-paas.org
END:VEVENT
BEGIN:VEVENT
UID:weekly-1
RECURRENCE-ID:20160613T090000Z
DTSTART:20160613T100000Z
DTEND:20160613T103000Z
SUMMARY:Weekly review (moved)
ATTENDEE;PARTSTAT=NEEDS-ACTION;CN=Jane Doe:MAILTO:janedoe@open-paas.org
END:VEVENT
END:VCALENDAR
"#;

/// A DAV store with real conditional-write semantics
struct InMemoryDav {
    ical: String,
    state: Mutex<DavState>,
}

struct DavState {
    /// Version counter the served ETag is derived from
    version: u32,
    /// How many times a concurrent writer still sneaks in between a fetch
    /// and the following write
    races_remaining: u32,
    accepted_bodies: Vec<Value>,
    write_attempts: u32,
}

impl InMemoryDav {
    fn new(ical: &str, races: u32) -> Self {
        Self {
            ical: ical.to_string(),
            state: Mutex::new(DavState {
                version: 0,
                races_remaining: races,
                accepted_bodies: Vec::new(),
                write_attempts: 0,
            }),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryDav {
    async fn get_event(
        &self,
        _user_id: &str,
        _calendar_uri: Option<&str>,
        _event_uid: Option<&str>,
    ) -> Result<FetchedEvent, Error> {
        let state = self.state.lock().unwrap();
        Ok(FetchedEvent {
            ical: self.ical.clone(),
            etag: Some(format!("\"v{}\"", state.version)),
        })
    }

    async fn store_event_if_match(
        &self,
        _user_id: &str,
        _calendar_uri: &str,
        _event_uid: &str,
        jcal: &Value,
        etag: Option<&str>,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.write_attempts += 1;

        if state.races_remaining > 0 {
            state.races_remaining -= 1;
            state.version += 1;
        }
        if etag != Some(format!("\"v{}\"", state.version).as_str()) {
            return Err(Error::Conflict);
        }

        state.version += 1;
        state.accepted_bodies.push(jcal.clone());
        Ok(())
    }
}

/// Extract the partstat of an attendee from a written jCal body,
/// looking at every vevent component
fn partstats_of(jcal: &Value, email: &str) -> Vec<String> {
    let mailto = format!("MAILTO:{}", email);
    let mut stats = Vec::new();

    for component in jcal[2].as_array().unwrap() {
        if component[0] != "vevent" {
            continue;
        }
        for property in component[1].as_array().unwrap() {
            if property[0] == "attendee" && property[3] == mailto.as_str() {
                stats.push(property[1]["partstat"].as_str().unwrap_or_default().to_string());
            }
        }
    }
    stats
}

fn decline_request() -> ParticipationRequest {
    ParticipationRequest {
        calendar_owner_id: "584abaa9e2d7d7686cff340f".to_string(),
        calendar_uri: "events".to_string(),
        event_uid: "weekly-1".to_string(),
        attendee_email: "janedoe@open-paas.org".to_string(),
        target_status: PartStat::Declined,
    }
}

#[tokio::test]
async fn test_uncontended_decline_updates_master_and_exception() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dav = InMemoryDav::new(RECURRING_MEETING, 0);
    reconcile_participation(&dav, &decline_request()).await.unwrap();

    let state = dav.state.lock().unwrap();
    assert_eq!(state.write_attempts, 1);
    assert_eq!(state.accepted_bodies.len(), 1);
    // Both the master event and the moved occurrence carry the new status
    assert_eq!(
        partstats_of(&state.accepted_bodies[0], "janedoe@open-paas.org"),
        vec!["DECLINED", "DECLINED"]
    );
}

#[tokio::test]
async fn test_contended_decline_wins_after_losing_three_races() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dav = InMemoryDav::new(RECURRING_MEETING, 3);
    reconcile_participation(&dav, &decline_request()).await.unwrap();

    let state = dav.state.lock().unwrap();
    assert_eq!(state.write_attempts, 4);
    assert_eq!(state.accepted_bodies.len(), 1);
    assert_eq!(
        partstats_of(&state.accepted_bodies[0], "janedoe@open-paas.org"),
        vec!["DECLINED", "DECLINED"]
    );
}

#[tokio::test]
async fn test_overly_contended_event_exhausts_the_retry_budget() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dav = InMemoryDav::new(RECURRING_MEETING, u32::MAX);
    let err = reconcile_participation(&dav, &decline_request()).await.unwrap_err();

    assert!(matches!(err, Error::RetryExhausted { attempts: 12 }));
    let state = dav.state.lock().unwrap();
    assert_eq!(state.write_attempts, 12);
    assert!(state.accepted_bodies.is_empty());
}

struct NobodyHome;

#[async_trait]
impl AccountDirectory for NobodyHome {
    async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, Error> {
        Ok(None)
    }
}

#[async_trait]
impl ConfigSource for NobodyHome {
    async fn base_url(&self) -> Result<String, Error> {
        Ok("http://localhost:8080".to_string())
    }
}

#[async_trait]
impl LinkBuilder for NobodyHome {
    async fn event_details(&self, event_path: &str) -> Result<String, Error> {
        Ok(format!("http://localhost:8080/calendar/#/event{}", event_path))
    }

    async fn event_in_calendar(&self, _ics: &str) -> Result<String, Error> {
        Ok("http://localhost:8080/calendar/".to_string())
    }

    async fn action_links(
        &self,
        base_url: &str,
        request: &ParticipationRequest,
    ) -> Result<Value, Error> {
        Ok(serde_json::json!({
            "accepted": format!("{}/accept/{}", base_url, request.event_uid),
            "declined": format!("{}/decline/{}", base_url, request.event_uid),
            "tentative": format!("{}/tentative/{}", base_url, request.event_uid),
        }))
    }
}

#[tokio::test]
async fn test_email_link_click_of_an_external_attendee() {
    let _ = env_logger::builder().is_test(true).try_init();

    let collaborators = Arc::new(NobodyHome);
    let action = ParticipationAction::new(
        InMemoryDav::new(RECURRING_MEETING, 1),
        collaborators.clone(),
        collaborators.clone(),
        collaborators,
    );

    match action.resolve(&decline_request(), "en").await {
        ActionOutcome::Consultation { attendee_email, links, locale } => {
            assert_eq!(attendee_email, "janedoe@open-paas.org");
            assert_eq!(locale, "en");
            assert_eq!(links["declined"], "http://localhost:8080/decline/weekly-1");
        }
        other => panic!("expected the consultation page, got {:?}", other),
    }
}
