use async_trait::async_trait;
use tracing::info;

use super::{NotificationSender, SenderError};

/// Emits notifications as log lines. Used when no real channel is configured.
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    fn channel_type(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &str) -> Result<(), SenderError> {
        info!(notification = %message, "Notification.");
        Ok(())
    }
}
