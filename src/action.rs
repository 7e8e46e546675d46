//! Outcome of a user-facing participation action.
//!
//! An attendee clicking an action link in an invitation email must always
//! land on a page, whatever happened underneath: the transport layer
//! answers 200 and the difference between success and failure lives in the
//! rendered view. This module decides which view that is; actually
//! rendering it is the web layer's business.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;
use crate::reconcile::{reconcile_participation, ParticipationRequest};
use crate::settings::CALENDAR_UI_PATH;
use crate::traits::{AccountDirectory, ConfigSource, EventStore, LinkBuilder};

/// What the web layer should present once the action ran
#[derive(Clone, Debug)]
pub enum ActionOutcome {
    /// The attendee has a local account: send them to their calendar
    Redirect(String),
    /// No local account: show the consultation page with fresh action links
    Consultation { attendee_email: String, links: Value, locale: String },
    /// Something failed; the error view carries the 400/500 classification
    ErrorView { code: u16 },
}

pub struct ParticipationAction<S: EventStore> {
    store: S,
    directory: Arc<dyn AccountDirectory>,
    config: Arc<dyn ConfigSource>,
    links: Arc<dyn LinkBuilder>,
}

impl<S: EventStore> ParticipationAction<S> {
    pub fn new(
        store: S,
        directory: Arc<dyn AccountDirectory>,
        config: Arc<dyn ConfigSource>,
        links: Arc<dyn LinkBuilder>,
    ) -> Self {
        Self { store, directory, config, links }
    }

    /// Run the reconciliation workflow and decide the resulting view.
    /// Never fails: every error collapses into an [`ActionOutcome::ErrorView`].
    pub async fn resolve(&self, request: &ParticipationRequest, locale: &str) -> ActionOutcome {
        if let Err(err) = reconcile_participation(&self.store, request).await {
            log::error!(
                "Participation change failed for {} on event {}: {}",
                request.attendee_email,
                request.event_uid,
                err
            );
            return ActionOutcome::ErrorView { code: err.status_code() };
        }

        match self.acknowledge(request, locale).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!(
                    "Participation change stored but the response could not be built for {}: {}",
                    request.attendee_email,
                    err
                );
                ActionOutcome::ErrorView { code: err.status_code() }
            }
        }
    }

    async fn acknowledge(
        &self,
        request: &ParticipationRequest,
        locale: &str,
    ) -> Result<ActionOutcome, Error> {
        if self.directory.find_by_email(&request.attendee_email).await?.is_some() {
            return Ok(ActionOutcome::Redirect(CALENDAR_UI_PATH.to_string()));
        }

        // External attendees get a consultation page so they can still
        // change their mind later
        let base_url = self.config.base_url().await?;
        let links = self.links.action_links(&base_url, request).await?;

        Ok(ActionOutcome::Consultation {
            attendee_email: request.attendee_email.clone(),
            links,
            locale: locale.to_string(),
        })
    }
}
