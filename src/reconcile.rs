//! Participation reconciliation workflow.
//!
//! Applies an attendee's Accept/Decline/Tentative action to an event stored
//! on the DAV server: fetch the current representation, locate the attendee
//! in the master event and its recurrence exceptions, set the status, and
//! write back under an `If-Match` precondition. A precondition failure
//! means somebody else won the race; the workflow re-fetches and tries
//! again, up to [`MAX_WRITE_ATTEMPTS`] times in total.
//!
//! Each attempt works on a fresh document: nothing fetched or mutated
//! survives a conflict, so every write is derived from the latest state the
//! server exposed. Mutual exclusion is entirely the server's business; no
//! local locking exists.

use crate::error::Error;
use crate::ical::participation::{apply_participation, PartStat};
use crate::ical::parser::parse;
use crate::resource::RemoteEventHandle;
use crate::settings::MAX_WRITE_ATTEMPTS;
use crate::traits::EventStore;

/// One requested participation change
#[derive(Clone, Debug)]
pub struct ParticipationRequest {
    pub calendar_owner_id: String,
    pub calendar_uri: String,
    pub event_uid: String,
    pub attendee_email: String,
    pub target_status: PartStat,
}

/// Run the reconciliation workflow to completion.
///
/// Fails without writing when the attendee is absent from the event and all
/// of its exceptions ([`Error::AttendeeNotFound`], a client-input error).
/// Transport failures are surfaced as-is; only the conflict case (HTTP 412)
/// is retried, bounded by [`MAX_WRITE_ATTEMPTS`].
pub async fn reconcile_participation<S: EventStore + ?Sized>(
    store: &S,
    request: &ParticipationRequest,
) -> Result<(), Error> {
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let fetched = store
            .get_event(
                &request.calendar_owner_id,
                Some(request.calendar_uri.as_str()),
                Some(request.event_uid.as_str()),
            )
            .await?;

        let handle = RemoteEventHandle {
            calendar_owner_id: request.calendar_owner_id.clone(),
            calendar_uri: request.calendar_uri.clone(),
            event_uid: request.event_uid.clone(),
            etag: fetched.etag,
        };

        let mut calendar = parse(&fetched.ical)?;
        let matched =
            apply_participation(&mut calendar, &request.attendee_email, request.target_status);
        if matched == 0 {
            return Err(Error::AttendeeNotFound {
                email: request.attendee_email.clone(),
                uid: request.event_uid.clone(),
            });
        }
        log::debug!(
            "Setting {} to {} on {} component(s) of event {} (attempt {}/{})",
            request.attendee_email,
            request.target_status,
            matched,
            request.event_uid,
            attempt,
            MAX_WRITE_ATTEMPTS
        );

        let jcal = calendar.to_jcal();
        match store
            .store_event_if_match(
                &handle.calendar_owner_id,
                &handle.calendar_uri,
                &handle.event_uid,
                &jcal,
                handle.etag.as_deref(),
            )
            .await
        {
            Ok(()) => return Ok(()),
            Err(Error::Conflict) => {
                log::info!(
                    "Event {} changed under attendee {} (attempt {}/{}), fetching it again",
                    request.event_uid,
                    request.attendee_email,
                    attempt,
                    MAX_WRITE_ATTEMPTS
                );
            }
            Err(err) => return Err(err),
        }
    }

    log::error!(
        "Giving up on event {} for attendee {}: still conflicting after {} write attempts",
        request.event_uid,
        request.attendee_email,
        MAX_WRITE_ATTEMPTS
    );
    Err(Error::RetryExhausted { attempts: MAX_WRITE_ATTEMPTS })
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::resource::FetchedEvent;

    const MEETING_ICAL: &str = r#"BEGIN:VCALENDAR
VERSION:2.0
BEGIN:VEVENT
UID:meeting-1
SEQUENCE:0
DTSTART:20150612T150000Z
DTEND:20150612T153000Z
SUMMARY:Sprint planning
ORGANIZER;CN=John Doe:MAILTO:johndoe@open-paas.org
ATTENDEE;PARTSTAT=NEEDS-ACTION;CN=Jane Doe:MAILTO:janedoe@open-paas.org
END:VEVENT
END:VCALENDAR
"#;

    /// In-memory store whose conditional writes fail with a conflict for
    /// the first `conflicts` attempts
    struct ContendedStore {
        ical: String,
        conflicts: Mutex<u32>,
        gets: Mutex<u32>,
        puts: Mutex<Vec<Value>>,
    }

    impl ContendedStore {
        fn new(ical: &str, conflicts: u32) -> Self {
            Self {
                ical: ical.to_string(),
                conflicts: Mutex::new(conflicts),
                gets: Mutex::new(0),
                puts: Mutex::new(Vec::new()),
            }
        }

        fn put_count(&self) -> usize {
            self.puts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EventStore for ContendedStore {
        async fn get_event(
            &self,
            _user_id: &str,
            _calendar_uri: Option<&str>,
            _event_uid: Option<&str>,
        ) -> Result<FetchedEvent, Error> {
            *self.gets.lock().unwrap() += 1;
            Ok(FetchedEvent { ical: self.ical.clone(), etag: Some("\"etag-1\"".to_string()) })
        }

        async fn store_event_if_match(
            &self,
            _user_id: &str,
            _calendar_uri: &str,
            _event_uid: &str,
            jcal: &Value,
            etag: Option<&str>,
        ) -> Result<(), Error> {
            assert_eq!(etag, Some("\"etag-1\""));
            self.puts.lock().unwrap().push(jcal.clone());

            let mut remaining = self.conflicts.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Conflict);
            }
            Ok(())
        }
    }

    fn accept_request() -> ParticipationRequest {
        ParticipationRequest {
            calendar_owner_id: "c3po".to_string(),
            calendar_uri: "events".to_string(),
            event_uid: "meeting-1".to_string(),
            attendee_email: "janedoe@open-paas.org".to_string(),
            target_status: PartStat::Accepted,
        }
    }

    #[tokio::test]
    async fn test_clean_write_succeeds_first_try() {
        let store = ContendedStore::new(MEETING_ICAL, 0);
        reconcile_participation(&store, &accept_request()).await.unwrap();

        assert_eq!(store.put_count(), 1);
        assert_eq!(*store.gets.lock().unwrap(), 1);

        // The written body carries the new participation status
        let body = store.puts.lock().unwrap()[0].clone();
        assert!(body.to_string().contains("ACCEPTED"));
    }

    #[tokio::test]
    async fn test_conflicts_are_retried_with_a_fresh_fetch() {
        let store = ContendedStore::new(MEETING_ICAL, 3);
        reconcile_participation(&store, &accept_request()).await.unwrap();

        assert_eq!(store.put_count(), 4);
        // One fetch per attempt, never a blind re-PUT of a stale patch
        assert_eq!(*store.gets.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_retry_is_bounded_to_twelve_attempts() {
        let store = ContendedStore::new(MEETING_ICAL, u32::MAX);
        let err = reconcile_participation(&store, &accept_request()).await.unwrap_err();

        assert!(matches!(err, Error::RetryExhausted { attempts: 12 }));
        assert_eq!(store.put_count(), 12);
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_eleven_conflicts_succeed_on_the_last_attempt() {
        let store = ContendedStore::new(MEETING_ICAL, 11);
        reconcile_participation(&store, &accept_request()).await.unwrap();

        assert_eq!(store.put_count(), 12);
    }

    #[tokio::test]
    async fn test_unknown_attendee_never_writes() {
        let store = ContendedStore::new(MEETING_ICAL, 0);
        let mut request = accept_request();
        request.attendee_email = "nobody@open-paas.org".to_string();

        let err = reconcile_participation(&store, &request).await.unwrap_err();
        assert!(matches!(err, Error::AttendeeNotFound { .. }));
        assert_eq!(err.status_code(), 400);
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failures_are_not_retried() {
        struct BrokenStore;

        #[async_trait]
        impl EventStore for BrokenStore {
            async fn get_event(
                &self,
                _user_id: &str,
                _calendar_uri: Option<&str>,
                _event_uid: Option<&str>,
            ) -> Result<FetchedEvent, Error> {
                Ok(FetchedEvent { ical: MEETING_ICAL.to_string(), etag: None })
            }

            async fn store_event_if_match(
                &self,
                _user_id: &str,
                _calendar_uri: &str,
                _event_uid: &str,
                _jcal: &Value,
                _etag: Option<&str>,
            ) -> Result<(), Error> {
                Err(Error::unexpected_status(503))
            }
        }

        let err = reconcile_participation(&BrokenStore, &accept_request()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_repeated_runs_are_idempotent() {
        let store = ContendedStore::new(MEETING_ICAL, 0);
        reconcile_participation(&store, &accept_request()).await.unwrap();
        reconcile_participation(&store, &accept_request()).await.unwrap();

        let puts = store.puts.lock().unwrap();
        assert_eq!(puts.len(), 2);
        // Same input, same target status: the second write changes nothing
        assert_eq!(puts[0], puts[1]);
    }
}
