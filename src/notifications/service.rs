use tracing::{debug, error, info};

use super::models::ChannelConfig;
use super::senders::{NotificationSender, SenderError, build_sender};

/// Delivers monitor notifications through one configured channel.
///
/// Delivery failures are logged and swallowed: losing an alert is preferred
/// over stopping the monitor.
pub struct NotificationService {
    sender: Box<dyn NotificationSender>,
}

impl NotificationService {
    pub fn new(sender: Box<dyn NotificationSender>) -> Self {
        Self { sender }
    }

    pub fn from_config(config: &ChannelConfig) -> Result<Self, SenderError> {
        let sender = build_sender(config)?;
        info!(channel = sender.channel_type(), "Notification channel ready.");
        Ok(Self::new(sender))
    }

    pub fn channel_type(&self) -> &'static str {
        self.sender.channel_type()
    }

    /// Sends `message`, returning whether it was accepted by the channel.
    pub async fn deliver(&self, message: &str) -> bool {
        match self.sender.send(message).await {
            Ok(()) => {
                debug!(channel = self.sender.channel_type(), "Notification delivered.");
                true
            }
            Err(e) => {
                error!(channel = self.sender.channel_type(), error = %e, "Failed to deliver notification.");
                false
            }
        }
    }

    pub async fn shutdown(&self) {
        self.sender.shutdown().await;
        info!(channel = self.sender.channel_type(), "Notification channel closed.");
    }
}
