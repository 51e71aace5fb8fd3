//! Configuration module for the auto texter.
//!
//! Handles loading and validation of bot configuration: Telegram API
//! credentials, the send schedule, and the media/sticker catalogs.

mod catalog;
mod schedule;
mod settings;

pub use catalog::{MediaCatalog, MediaItem, StickerCatalog, StickerItem};
pub use schedule::{PillReminder, ScheduleConfig, TimeWindow, UserSchedule};
pub use settings::{BotSettings, DepletionPolicy, SelectionOrder, TelegramConfig};

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Pool name for morning media items.
pub const MORNING_MEDIA_POOL: &str = "morning_media";

/// Pool name for afternoon media items.
pub const AFTERNOON_MEDIA_POOL: &str = "afternoon_media";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Schedule names recipient '{name}' but no such user is configured")]
    UnknownRecipient { name: String },

    #[error("User '{user}' has an invalid {entry} window: {start} is after {end}")]
    InvalidWindow {
        user: String,
        entry: &'static str,
        start: String,
        end: String,
    },

    #[error("Duplicate uid {uid} in pool '{pool}'")]
    DuplicateUid { pool: String, uid: u32 },

    #[error("Item {uid} in pool '{pool}' has an empty path")]
    EmptyPath { pool: String, uid: u32 },

    #[error("No users configured in the schedule")]
    NoUsers,
}

/// Reads and parses a YAML document from disk.
pub(crate) fn read_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Serializes a value as YAML and writes it to disk.
pub(crate) fn save_yaml<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let content = serde_yaml::to_string(value)?;
    std::fs::write(path, content)?;
    Ok(())
}
