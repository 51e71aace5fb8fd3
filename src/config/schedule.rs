//! Send schedule configuration and validation.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::{read_yaml, save_yaml, ConfigError};
use crate::telegram::ChatRef;

/// A time-of-day range within which a randomized send may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Earliest time of day the action may fire.
    pub start_time: NaiveTime,

    /// Latest time of day the action may fire.
    pub end_time: NaiveTime,
}

/// Fixed-time pill reminder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillReminder {
    /// Time of day the reminder loop starts.
    pub time: NaiveTime,

    /// Reminder text; a default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PillReminder {
    /// Returns the reminder text to send.
    #[must_use]
    pub fn text(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or("\u{1f48a} Remember to take your pill! \u{2764}\u{fe0f}")
    }
}

/// Per-user schedule: where to send and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSchedule {
    /// Telegram chat identifier of the user.
    pub chat_id: i64,

    /// Access hash for the chat, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_hash: Option<i64>,

    /// Window for the daily morning greeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morning_greeting: Option<TimeWindow>,

    /// Window for the daily afternoon media item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub afternoon_media: Option<TimeWindow>,

    /// Daily pill reminder settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pills_reminder: Option<PillReminder>,
}

impl UserSchedule {
    /// Returns the chat reference messages for this user are sent to.
    #[must_use]
    pub const fn chat_ref(&self) -> ChatRef {
        ChatRef {
            chat_id: self.chat_id,
            access_hash: self.access_hash,
        }
    }
}

/// Full schedule configuration: named users plus the active recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Name of the user scheduled sends go to.
    pub recipient: String,

    /// All configured users, keyed by name.
    pub users: BTreeMap<String, UserSchedule>,
}

impl ScheduleConfig {
    /// Loads the schedule from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_yaml(path)
    }

    /// Saves the schedule to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        save_yaml(self, path)
    }

    /// Validates the schedule.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users.is_empty() {
            return Err(ConfigError::NoUsers);
        }

        if !self.users.contains_key(&self.recipient) {
            return Err(ConfigError::UnknownRecipient {
                name: self.recipient.clone(),
            });
        }

        for (name, user) in &self.users {
            for (entry, window) in [
                ("morning_greeting", user.morning_greeting),
                ("afternoon_media", user.afternoon_media),
            ] {
                if let Some(window) = window
                    && window.start_time > window.end_time
                {
                    return Err(ConfigError::InvalidWindow {
                        user: name.clone(),
                        entry,
                        start: window.start_time.to_string(),
                        end: window.end_time.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns the schedule of the configured recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the recipient is not among the configured users.
    pub fn recipient_schedule(&self) -> Result<&UserSchedule, ConfigError> {
        self.users
            .get(&self.recipient)
            .ok_or_else(|| ConfigError::UnknownRecipient {
                name: self.recipient.clone(),
            })
    }

    /// Creates an example configuration for users to reference.
    #[must_use]
    pub fn example() -> Self {
        let user = UserSchedule {
            chat_id: 123_456_789,
            access_hash: None,
            morning_greeting: Some(TimeWindow {
                start_time: NaiveTime::from_hms_opt(7, 30, 0).unwrap_or_default(),
                end_time: NaiveTime::from_hms_opt(8, 45, 0).unwrap_or_default(),
            }),
            afternoon_media: Some(TimeWindow {
                start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default(),
                end_time: NaiveTime::from_hms_opt(16, 30, 0).unwrap_or_default(),
            }),
            pills_reminder: Some(PillReminder {
                time: NaiveTime::from_hms_opt(21, 45, 0).unwrap_or_default(),
                message: None,
            }),
        };

        Self {
            recipient: "sweetheart".to_owned(),
            users: BTreeMap::from([("sweetheart".to_owned(), user)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
        TimeWindow {
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        }
    }

    #[test]
    fn test_example_validates() {
        assert!(ScheduleConfig::example().validate().is_ok());
    }

    #[test]
    fn test_validate_no_users() {
        let config = ScheduleConfig {
            recipient: "nobody".to_owned(),
            users: BTreeMap::new(),
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoUsers)));
    }

    #[test]
    fn test_validate_unknown_recipient() {
        let mut config = ScheduleConfig::example();
        config.recipient = "stranger".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownRecipient { .. })
        ));
    }

    #[test]
    fn test_validate_inverted_window() {
        let mut config = ScheduleConfig::example();
        if let Some(user) = config.users.get_mut("sweetheart") {
            user.morning_greeting = Some(window((9, 0), (8, 0)));
        }
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_parse_yaml_times() {
        let yaml = "\
recipient: love
users:
  love:
    chat_id: 42
    morning_greeting:
      start_time: \"07:30:00\"
      end_time: \"08:45:00\"
    pills_reminder:
      time: \"21:45:00\"
";
        let config: ScheduleConfig = serde_yaml::from_str(yaml).unwrap();
        let user = &config.users["love"];
        assert_eq!(user.chat_id, 42);
        assert_eq!(
            user.morning_greeting.unwrap().start_time,
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert!(user.afternoon_media.is_none());
        assert_eq!(
            user.pills_reminder.as_ref().unwrap().time,
            NaiveTime::from_hms_opt(21, 45, 0).unwrap()
        );
    }

    #[test]
    fn test_pill_reminder_default_text() {
        let reminder = PillReminder {
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            message: None,
        };
        assert!(!reminder.text().is_empty());

        let custom = PillReminder {
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            message: Some("take it now".to_owned()),
        };
        assert_eq!(custom.text(), "take it now");
    }
}
