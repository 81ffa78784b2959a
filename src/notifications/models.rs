use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Notification backend selected in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    Telegram {
        bot_token: String,
        chat_id: String,
    },
    Webhook {
        url: String,
        #[serde(default = "default_webhook_method")]
        method: String, // "GET" or "POST"
        #[serde(default)]
        headers: Option<HashMap<String, String>>,
        /// Tera template for the request body; `message` and `message_json` are in scope.
        #[serde(default)]
        body_template: Option<String>,
    },
    Email {
        smtp_server: String,
        #[serde(default)]
        smtp_port: Option<u16>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        /// STARTTLS on the submission port when true, implicit TLS otherwise.
        #[serde(default = "default_starttls")]
        starttls: bool,
        from: String,
        to: Vec<String>,
    },
    /// Writes notifications to the log only.
    Log,
}

impl ChannelConfig {
    pub fn channel_type(&self) -> &'static str {
        match self {
            ChannelConfig::Telegram { .. } => "telegram",
            ChannelConfig::Webhook { .. } => "webhook",
            ChannelConfig::Email { .. } => "email",
            ChannelConfig::Log => "log",
        }
    }
}

fn default_webhook_method() -> String {
    "POST".to_string()
}

fn default_starttls() -> bool {
    true
}
