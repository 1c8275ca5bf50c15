//! Mail transport settings, read from the environment on every submission

use crate::error::{ContactError, Result};
use std::fmt;

pub const SMTP_HOST: &str = "SMTP_HOST";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USER: &str = "SMTP_USER";
pub const SMTP_PASS: &str = "SMTP_PASS";
pub const MAIL_TO: &str = "MAIL_TO";
pub const MAIL_FROM: &str = "MAIL_FROM";

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub to: String,
    pub from: String,
}

impl MailSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    ///
    /// `MAIL_TO` and `MAIL_FROM` fall back to `SMTP_USER`; `SMTP_PORT` defaults to 587.
    /// Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            value(key).ok_or_else(|| ContactError::Configuration(format!("{} is not set", key)))
        };

        let host = required(SMTP_HOST)?.trim().to_string();
        let user = required(SMTP_USER)?.trim().to_string();
        let password = required(SMTP_PASS)?;

        let port = match value(SMTP_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ContactError::Configuration(format!("{} is not a valid port: {:?}", SMTP_PORT, raw))
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let to = value(MAIL_TO).map(|v| v.trim().to_string()).unwrap_or_else(|| user.clone());
        let from = value(MAIL_FROM).map(|v| v.trim().to_string()).unwrap_or_else(|| user.clone());

        Ok(Self {
            host,
            port,
            user,
            password,
            to,
            from,
        })
    }

    pub fn implicit_tls(&self) -> bool {
        self.port == IMPLICIT_TLS_PORT
    }
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("to", &self.to)
            .field("from", &self.from)
            .finish()
    }
}

/// Where the gate gets transport settings from. Consulted per request, never cached.
pub trait MailSettingsSource: Send + Sync {
    fn load(&self) -> Result<MailSettings>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvMailSettings;

impl MailSettingsSource for EnvMailSettings {
    fn load(&self) -> Result<MailSettings> {
        MailSettings::from_env()
    }
}

/// Fixed settings, handy for embedding and tests.
impl MailSettingsSource for MailSettings {
    fn load(&self) -> Result<MailSettings> {
        Ok(self.clone())
    }
}
