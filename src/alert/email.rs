use anyhow::{anyhow, Context, Result};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Deserialize;

use super::AlertChannel;

pub const ALERT_SUBJECT: &str = "Intrusion Alert";
pub const ALERT_BODY: &str = "Intrusion detected at your premises.";

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// SMTP endpoint. Connections use implicit TLS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
        }
    }
}

/// Credentials supplied out-of-band (secrets file or environment).
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct EmailSecrets {
    pub sender_email: String,
    pub sender_password: String,
    pub receiver_email: String,
}

impl std::fmt::Debug for EmailSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSecrets")
            .field("sender_email", &self.sender_email)
            .field("sender_password", &"<redacted>")
            .field("receiver_email", &self.receiver_email)
            .finish()
    }
}

impl EmailSecrets {
    /// Fixed-subject, fixed-body plaintext alert from sender to receiver.
    pub fn alert_message(&self) -> Result<Message> {
        let from: Mailbox = self
            .sender_email
            .parse()
            .with_context(|| format!("invalid sender address '{}'", self.sender_email))?;
        let to: Mailbox = self
            .receiver_email
            .parse()
            .with_context(|| format!("invalid receiver address '{}'", self.receiver_email))?;
        Message::builder()
            .from(from)
            .to(to)
            .subject(ALERT_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(ALERT_BODY.to_string())
            .context("failed to build alert email")
    }
}

/// Sends the alert email over SMTP with implicit TLS.
pub struct EmailChannel {
    settings: EmailSettings,
    secrets: Option<EmailSecrets>,
}

impl EmailChannel {
    pub fn new(settings: EmailSettings, secrets: Option<EmailSecrets>) -> Self {
        if secrets.is_none() {
            log::warn!("email secrets not configured; email alerts will fail");
        }
        Self { settings, secrets }
    }
}

impl AlertChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn fire(&mut self) -> Result<()> {
        let secrets = self.secrets.as_ref().ok_or_else(|| {
            anyhow!("email secrets not configured (sender_email, sender_password, receiver_email)")
        })?;
        let message = secrets.alert_message()?;

        let mailer = SmtpTransport::relay(&self.settings.smtp_host)
            .with_context(|| format!("failed to configure SMTP relay {}", self.settings.smtp_host))?
            .port(self.settings.smtp_port)
            .credentials(Credentials::new(
                secrets.sender_email.clone(),
                secrets.sender_password.clone(),
            ))
            .build();

        mailer.send(&message).with_context(|| {
            format!(
                "SMTP delivery via {}:{} failed",
                self.settings.smtp_host, self.settings.smtp_port
            )
        })?;
        Ok(())
    }
}
