use async_trait::async_trait;
use thiserror::Error;

use super::models::ChannelConfig;

pub mod email;
pub mod log;
pub mod telegram;
pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    TemplatingError(#[from] tera::Error),
    #[error("SMTP error: {0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),
}

/// A channel that can deliver a text message.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Short channel name used in logs.
    fn channel_type(&self) -> &'static str;

    async fn send(&self, message: &str) -> Result<(), SenderError>;

    /// Releases long-lived resources. Called once when the monitor stops.
    async fn shutdown(&self) {}
}

/// Builds the sender for a configured channel.
pub fn build_sender(config: &ChannelConfig) -> Result<Box<dyn NotificationSender>, SenderError> {
    let sender: Box<dyn NotificationSender> = match config {
        ChannelConfig::Telegram { bot_token, chat_id } => {
            Box::new(telegram::TelegramSender::new(bot_token, chat_id)?)
        }
        ChannelConfig::Webhook {
            url,
            method,
            headers,
            body_template,
        } => Box::new(webhook::WebhookSender::new(
            url,
            method,
            headers.as_ref(),
            body_template.clone(),
        )?),
        ChannelConfig::Email {
            smtp_server,
            smtp_port,
            username,
            password,
            starttls,
            from,
            to,
        } => Box::new(email::EmailSender::new(email::SmtpSettings {
            server: smtp_server,
            port: *smtp_port,
            username: username.as_deref(),
            password: password.as_deref(),
            starttls: *starttls,
            from,
            to,
        })?),
        ChannelConfig::Log => Box::new(log::LogSender),
    };
    Ok(sender)
}
