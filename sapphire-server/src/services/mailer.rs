//! Reminder email delivery
//!
//! SMTP via lettre when a relay is configured; otherwise a stub that logs
//! what would have been sent, so development setups exercise the reminder
//! path end to end without a mail server.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use sapphire_common::config::ReminderConfig;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

pub enum Mailer {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    Stub,
}

impl Mailer {
    /// Build from config: an SMTP host selects the real transport,
    /// otherwise stub mode.
    pub fn from_config(config: &ReminderConfig) -> Result<Self, MailerError> {
        let smtp = match &config.smtp {
            Some(smtp) => smtp,
            None => {
                info!("No SMTP host configured; reminder emails run in stub mode");
                return Ok(Mailer::Stub);
            }
        };

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?.port(smtp.port);
        if let Some(username) = &smtp.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                smtp.password.clone().unwrap_or_default(),
            ));
        }

        Ok(Mailer::Smtp {
            transport: builder.build(),
            from: config.from_address.parse()?,
        })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        match self {
            Mailer::Smtp { transport, from } => {
                let message = Message::builder()
                    .from(from.clone())
                    .to(to.parse()?)
                    .subject(subject)
                    .body(body.to_string())?;
                transport.send(message).await?;
                Ok(())
            }
            Mailer::Stub => {
                info!("[reminder][stub] would send to={} subject={}", to, subject);
                Ok(())
            }
        }
    }
}
