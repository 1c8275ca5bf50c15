//! Outbound mail capability

pub mod settings;
pub mod smtp;

pub use settings::{EnvMailSettings, MailSettings, MailSettingsSource};
pub use smtp::SmtpMailer;

use async_trait::async_trait;

/// A fully composed message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, settings: &MailSettings, mail: OutgoingMail) -> anyhow::Result<()>;
}
