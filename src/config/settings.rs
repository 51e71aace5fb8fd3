//! Application settings and Telegram configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("session.db")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self {
            api_id,
            api_hash,
            session_path: default_session_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID` and `TG_API_HASH` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let session_path =
            std::env::var("TG_SESSION_PATH").map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            session_path,
        })
    }
}

/// How the next unsent media item is selected from a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
    /// Catalog order, deterministic.
    #[default]
    InOrder,
    /// Uniform random among the unsent items.
    Random,
}

/// What to do when every item in a pool has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepletionPolicy {
    /// Clear the pool's sent record and start over.
    #[default]
    Reset,
    /// Stop sending and report that no content is available.
    Stop,
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Polling interval of the dispatcher loop in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Minimum interval between outbound sends in seconds (flood protection).
    #[serde(default = "default_min_send_interval")]
    pub min_send_interval_secs: u64,

    /// How media items are picked from their pool.
    #[serde(default)]
    pub selection_order: SelectionOrder,

    /// What happens when a pool runs dry.
    #[serde(default)]
    pub depletion_policy: DepletionPolicy,

    /// Log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_poll_interval() -> u64 {
    1
}

fn default_min_send_interval() -> u64 {
    3
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            min_send_interval_secs: default_min_send_interval(),
            selection_order: SelectionOrder::default(),
            depletion_policy: DepletionPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_poll_interval),
            min_send_interval_secs: std::env::var("MIN_SEND_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_min_send_interval),
            selection_order: match std::env::var("MEDIA_SELECTION").as_deref() {
                Ok("random") => SelectionOrder::Random,
                _ => SelectionOrder::InOrder,
            },
            depletion_policy: match std::env::var("ON_DEPLETED").as_deref() {
                Ok("stop") => DepletionPolicy::Stop,
                _ => DepletionPolicy::Reset,
            },
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::default();
        assert_eq!(settings.poll_interval_secs, 1);
        assert_eq!(settings.min_send_interval_secs, 3);
        assert_eq!(settings.selection_order, SelectionOrder::InOrder);
        assert_eq!(settings.depletion_policy, DepletionPolicy::Reset);
    }

    #[test]
    fn test_telegram_config_new() {
        let config = TelegramConfig::new(12345, "abc123".to_owned());
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "abc123");
        assert_eq!(config.session_path, PathBuf::from("session.db"));
    }
}
