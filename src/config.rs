use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::notifications::ChannelConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub targets_file: PathBuf,
    pub interval_seconds: u64,
    pub log_dir: String,
    pub notifier: ChannelConfig,
    /// Set when neither the file nor the environment named a notifier.
    pub notifier_defaulted: bool,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialAppConfig {
    targets_file: Option<PathBuf>,
    interval_seconds: Option<u64>,
    log_dir: Option<String>,
    notifier: Option<ChannelConfig>,
}

fn default_targets_file() -> PathBuf {
    PathBuf::from("sites.conf")
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl AppConfig {
    /// Loads the optional TOML file, then applies environment overrides.
    ///
    /// Runs before logging is initialised, so problems surface as errors only.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let file_config = match config_path {
            Some(path) => read_partial(path)?,
            None => PartialAppConfig::default(),
        };
        Self::resolve(file_config, |name| env::var(name).ok())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    fn resolve(
        file: PartialAppConfig,
        env_var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let interval_seconds = match env_var("SITEWATCH_INTERVAL_SECONDS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: "SITEWATCH_INTERVAL_SECONDS",
                value: raw.clone(),
            })?,
            None => file.interval_seconds.unwrap_or_else(default_interval_seconds),
        };
        if interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                name: "interval_seconds",
                value: "0".to_string(),
            });
        }

        let telegram_token = env_var("TELEGRAM_BOT_TOKEN").filter(|v| !v.is_empty());
        let telegram_chat = env_var("TELEGRAM_CHAT_ID").filter(|v| !v.is_empty());
        let mut notifier_defaulted = false;
        let notifier = match file.notifier {
            Some(ChannelConfig::Telegram { bot_token, chat_id }) => ChannelConfig::Telegram {
                bot_token: telegram_token.unwrap_or(bot_token),
                chat_id: telegram_chat.unwrap_or(chat_id),
            },
            Some(other) => other,
            None => match (telegram_token, telegram_chat) {
                (Some(bot_token), Some(chat_id)) => ChannelConfig::Telegram { bot_token, chat_id },
                _ => {
                    notifier_defaulted = true;
                    ChannelConfig::Log
                }
            },
        };

        Ok(AppConfig {
            targets_file: env_var("SITEWATCH_TARGETS_FILE")
                .map(PathBuf::from)
                .or(file.targets_file)
                .unwrap_or_else(default_targets_file),
            interval_seconds,
            log_dir: env_var("SITEWATCH_LOG_DIR")
                .or(file.log_dir)
                .unwrap_or_else(default_log_dir),
            notifier,
            notifier_defaulted,
        })
    }
}

fn read_partial(path: &Path) -> Result<PartialAppConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
