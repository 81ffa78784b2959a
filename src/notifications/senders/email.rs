use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{NotificationSender, SenderError};

const SUBJECT_PREFIX: &str = "[sitewatch]";

pub struct SmtpSettings<'a> {
    pub server: &'a str,
    pub port: Option<u16>,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub starttls: bool,
    pub from: &'a str,
    pub to: &'a [String],
}

/// Delivers notifications as plain-text email through an SMTP relay.
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailSender {
    pub fn new(settings: SmtpSettings<'_>) -> Result<Self, SenderError> {
        let from = parse_mailbox(settings.from)?;
        let to = settings
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "Email channel needs at least one recipient.".to_string(),
            ));
        }

        let mut builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(settings.server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(settings.server)?
        };
        if let Some(port) = settings.port {
            builder = builder.port(port);
        }
        if let (Some(username), Some(password)) = (settings.username, settings.password) {
            builder = builder.credentials(Credentials::new(
                username.to_string(),
                password.to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    fn build_message(&self, text: &str) -> Result<Message, SenderError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject_for(text))
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        builder
            .body(text.to_string())
            .map_err(|e| SenderError::SendFailed(format!("Failed to build email: {e}")))
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, SenderError> {
    raw.parse::<Mailbox>()
        .map_err(|e| SenderError::InvalidConfiguration(format!("Invalid email address {raw}: {e}")))
}

/// The first line of a notification, minus emoji decoration, makes the subject.
fn subject_for(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    let summary = first_line
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim();
    if summary.is_empty() {
        SUBJECT_PREFIX.to_string()
    } else {
        format!("{SUBJECT_PREFIX} {summary}")
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    fn channel_type(&self) -> &'static str {
        "email"
    }

    async fn send(&self, message: &str) -> Result<(), SenderError> {
        let email = self.build_message(message)?;
        let response = self.transport.send(email).await?;
        if !response.is_positive() {
            return Err(SenderError::SendFailed(format!(
                "SMTP server answered {}",
                response.code()
            )));
        }
        Ok(())
    }
}
