use super::{message::compose, payload::validate, ContactForm};
use crate::{
    config::MailConfig,
    error::{ContactError, Result},
    mail::{EnvMailSettings, MailSettings, MailSettingsSource, Mailer, OutgoingMail, SmtpMailer},
};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info};

/// Validates a submission, checks transport settings, and hands the composed
/// message to the mailer.
///
/// Rate limiting runs in front of the gate (see
/// [`rate_limit_middleware`](crate::middleware::rate_limit::rate_limit_middleware)).
/// Nothing is sent unless every earlier step passes, and a failed dispatch is not retried.
#[derive(Clone)]
pub struct SubmissionGate {
    mailer: Arc<dyn Mailer>,
    settings: Arc<dyn MailSettingsSource>,
    dispatch_timeout: Duration,
}

impl SubmissionGate {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        settings: Arc<dyn MailSettingsSource>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            mailer,
            settings,
            dispatch_timeout,
        }
    }

    /// SMTP delivery configured from the process environment.
    pub fn from_config(config: &MailConfig) -> Self {
        Self::new(
            Arc::new(SmtpMailer::new()),
            Arc::new(EnvMailSettings),
            Duration::from_secs(config.dispatch_timeout_seconds),
        )
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn MailSettingsSource>) -> Self {
        self.settings = settings;
        self
    }

    pub fn dispatch_timeout(&self) -> Duration {
        self.dispatch_timeout
    }

    pub async fn submit(&self, form: ContactForm) -> Result<()> {
        let payload = validate(form).map_err(|err| {
            debug!("Contact submission rejected: {}", err);
            err
        })?;

        let settings = self.settings.load()?;
        let mail = compose(&payload, &settings);

        self.dispatch(&settings, mail).await?;

        info!(
            reply_to = %payload.email,
            recipient = %settings.to,
            "contact message dispatched"
        );
        Ok(())
    }

    async fn dispatch(&self, settings: &MailSettings, mail: OutgoingMail) -> Result<()> {
        match timeout(self.dispatch_timeout, self.mailer.send(settings, mail)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(ContactError::DispatchFailed(format!("{:#}", err))),
            Err(_) => Err(ContactError::DispatchFailed(format!(
                "mail dispatch timed out after {:?}",
                self.dispatch_timeout
            ))),
        }
    }
}
