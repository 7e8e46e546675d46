//! Seams between this crate and the services it is deployed next to.
//!
//! The original system resolved all of these through a runtime service
//! registry; here every consumer receives its collaborators at construction
//! time, which keeps them mockable without a locator.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::Error;
use crate::reconcile::ParticipationRequest;
use crate::resource::FetchedEvent;

/// Issues short-lived access tokens for a user acting against the DAV
/// server.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn new_token(&self, user_id: &str) -> Result<String, Error>;
}

/// Discovers the base endpoint of the calendar storage server.
#[async_trait]
pub trait EndpointSource: Send + Sync {
    async fn dav_endpoint(&self) -> Result<Url, Error>;
}

/// The subset of the DAV transport the reconciliation workflow depends on.
///
/// [`crate::client::CaldavClient`] is the production implementation; tests
/// substitute in-memory stores.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fetch one stored event (or a broader listing, see
    /// [`crate::client::CaldavClient::get_event`]) together with its ETag.
    async fn get_event(
        &self,
        user_id: &str,
        calendar_uri: Option<&str>,
        event_uid: Option<&str>,
    ) -> Result<FetchedEvent, Error>;

    /// Conditionally overwrite one stored event with a jCal body.
    /// An `If-Match` precondition is sent whenever `etag` is known;
    /// a server-side precondition failure surfaces as [`Error::Conflict`].
    async fn store_event_if_match(
        &self,
        user_id: &str,
        calendar_uri: &str,
        event_uid: &str,
        jcal: &Value,
        etag: Option<&str>,
    ) -> Result<(), Error>;
}

/// A user account known to the deployment.
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: String,
    pub email: String,
}

/// Looks accounts up by their email address.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error>;
}

/// Deployment-level configuration lookups.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Public base URL of the web application.
    async fn base_url(&self) -> Result<String, Error>;
}

/// A resolved translation context for one recipient.
#[derive(Clone, Debug, Default)]
pub struct I18nContext {
    pub locale: String,
    catalog: HashMap<String, String>,
}

impl I18nContext {
    pub fn new(locale: impl Into<String>, catalog: HashMap<String, String>) -> Self {
        Self { locale: locale.into(), catalog }
    }

    /// Translate a message key, falling back to the key itself.
    pub fn translate(&self, key: &str) -> String {
        self.catalog.get(key).cloned().unwrap_or_else(|| key.to_string())
    }
}

/// Resolves the translation context to use when writing to an account.
#[async_trait]
pub trait I18nSource: Send + Sync {
    async fn for_account(&self, account: &Account) -> Result<I18nContext, Error>;
}

/// Builds deep links into the calendar web UI.
#[async_trait]
pub trait LinkBuilder: Send + Sync {
    /// Link to the detail view of the event stored at `event_path`.
    async fn event_details(&self, event_path: &str) -> Result<String, Error>;

    /// Link opening the calendar UI on the event described by `ics`.
    async fn event_in_calendar(&self, ics: &str) -> Result<String, Error>;

    /// Accept/decline/tentative action links for the consultation page.
    async fn action_links(
        &self,
        base_url: &str,
        request: &ParticipationRequest,
    ) -> Result<Value, Error>;
}

/// An outbound notification message envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
}

/// Renders and sends HTML notifications.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_html(
        &self,
        message: &MailMessage,
        template: &str,
        context: &Value,
    ) -> Result<(), Error>;
}
