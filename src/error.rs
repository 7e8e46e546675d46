//! Error taxonomy shared by the transport client, the iCal adapter and the
//! reconciliation workflow.
//!
//! Only [`Error::Conflict`] is ever retried, and only by the bounded loop in
//! [`crate::reconcile`]. Everything else is surfaced to the caller as-is.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The calendar payload is not well-formed iCalendar/jCal.
    #[error("unable to parse calendar data: {0}")]
    Parse(String),

    /// The addressed attendee is absent from the event and all of its
    /// recurrence exceptions. A usage error on the caller's side.
    #[error("attendee {email} is not listed in event {uid}")]
    AttendeeNotFound { email: String, uid: String },

    /// Any failure at the DAV transport boundary other than a write
    /// precondition failure.
    #[error("{0}")]
    Transport(String),

    /// The server rejected a conditional write (HTTP 412): somebody else
    /// updated the event since we fetched it.
    #[error("conditional update rejected by the DAV server (precondition failed)")]
    Conflict,

    /// The bounded conflict-retry loop ran out of attempts.
    #[error("event is too contended: gave up after {attempts} write attempts")]
    RetryExhausted { attempts: u32 },

    /// A collaborator lookup (token, endpoint, account...) failed.
    #[error("dependency resolution failed: {0}")]
    Dependency(String),
}

impl Error {
    /// Transport error for a response status outside the success range.
    pub fn unexpected_status(status: u16) -> Self {
        Error::Transport(format!("Invalid response status from DAV server {}", status))
    }

    /// The HTTP-equivalent classification rendered to end users: client
    /// mistakes are 400, everything else is on us (or the DAV server).
    pub fn status_code(&self) -> u16 {
        match self {
            Error::AttendeeNotFound { .. } => 400,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<minidom::Error> for Error {
    fn from(err: minidom::Error) -> Self {
        Error::Transport(format!("unreadable DAV response: {}", err))
    }
}
