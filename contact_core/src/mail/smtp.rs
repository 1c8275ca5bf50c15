//! SMTP delivery through lettre's async transport

use super::{MailSettings, Mailer, OutgoingMail};
use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Builds a fresh transport from the settings of each submission, so changes to
/// the environment take effect without a restart.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpMailer;

impl SmtpMailer {
    pub fn new() -> Self {
        Self
    }

    fn transport(settings: &MailSettings) -> anyhow::Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if settings.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .with_context(|| format!("invalid SMTP relay {}", settings.host))?;

        Ok(builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .build())
    }

    fn message(mail: OutgoingMail) -> anyhow::Result<Message> {
        let from: Mailbox = mail
            .from
            .parse()
            .with_context(|| format!("invalid sender address {:?}", mail.from))?;
        let to: Mailbox = mail
            .to
            .parse()
            .with_context(|| format!("invalid recipient address {:?}", mail.to))?;
        let reply_to: Mailbox = mail
            .reply_to
            .parse()
            .with_context(|| format!("invalid reply-to address {:?}", mail.reply_to))?;

        Message::builder()
            .from(from)
            .to(to)
            .reply_to(reply_to)
            .subject(mail.subject)
            .multipart(MultiPart::alternative_plain_html(mail.text, mail.html))
            .context("failed to build contact message")
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, settings: &MailSettings, mail: OutgoingMail) -> anyhow::Result<()> {
        let transport = Self::transport(settings)?;
        let message = Self::message(mail)?;

        let response = transport
            .send(message)
            .await
            .with_context(|| format!("SMTP delivery via {}:{} failed", settings.host, settings.port))?;

        tracing::debug!(code = %response.code(), "SMTP server accepted message");
        Ok(())
    }
}
