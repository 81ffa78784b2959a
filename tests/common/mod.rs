use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use sitewatch::notifications::{NotificationSender, NotificationService, SenderError};

/// Keeps every message it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingSender {
    pub sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl NotificationSender for RecordingSender {
    fn channel_type(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &str) -> Result<(), SenderError> {
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

pub fn recording_service() -> (NotificationService, Arc<Mutex<Vec<String>>>) {
    let sender = RecordingSender::default();
    let sent = sender.sent.clone();
    (NotificationService::new(Box::new(sender)), sent)
}
