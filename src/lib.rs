//! This crate manages attendee participation (RSVP) state for events stored
//! on a CalDAV server.
//!
//! It provides a DAV transport client in the [`client`] module, an
//! iCalendar/jCal document model in the [`ical`] module, and the
//! participation reconciliation workflow in the [`reconcile`] module: fetch
//! the stored event, set the attendee's status on the master event and
//! every recurrence exception, and write it back under an `If-Match`
//! precondition, retrying a bounded number of times when a concurrent
//! writer wins the race.
//!
//! The [`action`] and [`notify`] modules sit on top of the workflow: one
//! decides the page an email-link click should land on, the other renders
//! and sends alarm notification emails. All the services these need (token
//! issuance, endpoint discovery, account lookup, localization, mail) are
//! injected through the traits in [`traits`].

pub mod error;
pub use error::Error;

pub mod settings;
pub mod traits;

pub mod resource;
pub use resource::{FetchedEvent, RemoteEventHandle};

pub mod ical;
pub use ical::PartStat;

pub mod client;
pub use client::CaldavClient;

pub mod reconcile;
pub use reconcile::{reconcile_participation, ParticipationRequest};

pub mod action;
pub use action::{ActionOutcome, ParticipationAction};

pub mod notify;
pub use notify::{AlarmDispatcher, AlarmEvent};

pub mod xml;
