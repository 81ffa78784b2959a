use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{NotificationSender, SenderError};
use crate::version::USER_AGENT;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// A sender for pushing notifications via the Telegram Bot API.
///
/// The HTTP client is created once and reused for every message.
pub struct TelegramSender {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramSender {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, SenderError> {
        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "Telegram bot token and chat id are required.".to_string(),
            ));
        }
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    /// Points the sender at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

/// Escapes text for Telegram's HTML parse mode.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[async_trait]
impl NotificationSender for TelegramSender {
    fn channel_type(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<(), SenderError> {
        let escaped_message = escape_html(message);
        let payload = TelegramMessage {
            chat_id: &self.chat_id,
            text: &escaped_message,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(self.send_message_url())
            .json(&payload)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Telegram API returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
