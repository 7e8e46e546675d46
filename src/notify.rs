//! Alarm notification dispatch.
//!
//! Fired when a VALARM of kind EMAIL comes due (or when a workflow outcome
//! requires acknowledging the attendee): resolves the attendee's account,
//! assembles the localized mail context, and hands the rendered event over
//! to the mailer. Failures are logged and surfaced to the scheduler; this
//! module never retries on its own.

use std::sync::Arc;

use serde_json::json;

use crate::error::Error;
use crate::ical::content::event_content;
use crate::settings::ALARM_EMAIL_TEMPLATE;
use crate::traits::{AccountDirectory, ConfigSource, I18nSource, LinkBuilder, MailMessage, Mailer};

/// One alarm firing, as handed over by the scheduler
#[derive(Clone, Debug)]
pub struct AlarmEvent {
    pub ics: String,
    pub attendee_email: String,
    pub event_path: String,
}

pub struct AlarmDispatcher {
    directory: Arc<dyn AccountDirectory>,
    config: Arc<dyn ConfigSource>,
    i18n: Arc<dyn I18nSource>,
    links: Arc<dyn LinkBuilder>,
    mailer: Arc<dyn Mailer>,
}

impl AlarmDispatcher {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        config: Arc<dyn ConfigSource>,
        i18n: Arc<dyn I18nSource>,
        links: Arc<dyn LinkBuilder>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self { directory, config, i18n, links, mailer }
    }

    pub async fn dispatch(&self, alarm: &AlarmEvent) -> Result<(), Error> {
        match self.send_alarm_email(alarm).await {
            Ok(()) => Ok(()),
            Err(err) => {
                log::error!("Can not send alarm email to {}: {}", alarm.attendee_email, err);
                Err(err)
            }
        }
    }

    async fn send_alarm_email(&self, alarm: &AlarmEvent) -> Result<(), Error> {
        let account = self
            .directory
            .find_by_email(&alarm.attendee_email)
            .await?
            .ok_or_else(|| {
                Error::Dependency(format!(
                    "user can not be found from email {}",
                    alarm.attendee_email
                ))
            })?;

        let (base_url, i18n, event_details_link, see_in_calendar_link) = tokio::try_join!(
            self.config.base_url(),
            self.i18n.for_account(&account),
            self.links.event_details(&alarm.event_path),
            self.links.event_in_calendar(&alarm.ics),
        )?;

        let event = event_content(&alarm.ics, &base_url)?;
        let descriptor = event
            .alarm
            .clone()
            .ok_or_else(|| Error::Parse("event carries no alarm".to_string()))?;

        let message = MailMessage {
            to: alarm.attendee_email.clone(),
            subject: format!(
                "{} : {}",
                i18n.translate("Notification"),
                descriptor.summary.as_deref().unwrap_or_default()
            ),
        };
        let context = json!({
            "content": {
                "baseUrl": base_url,
                "event": event,
                "alarm": descriptor,
                "eventDetailsLink": event_details_link,
                "seeInCalendarLink": see_in_calendar_link,
            },
            "locale": i18n.locale,
        });

        self.mailer.send_html(&message, ALARM_EMAIL_TEMPLATE, &context).await
    }
}
