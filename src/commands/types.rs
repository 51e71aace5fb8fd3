//! Command types and definitions.

use std::fmt;

/// Available bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Health check.
    Health,

    /// Send the morning greeting to the recipient now, marking items sent.
    SendGreeting,

    /// Send the afternoon media to the recipient now, marking it sent.
    SendAfternoonMedia,

    /// Dry run of the morning greeting: sent back to the caller, nothing
    /// marked as sent.
    TestGreeting,

    /// Dry run of the afternoon media: sent back to the caller, nothing
    /// marked as sent.
    TestAfternoonMedia,

    /// When the next morning greeting fires.
    GreetingInfo,

    /// When the next afternoon media fires.
    AfternoonMediaInfo,

    /// Remaining items per media pool.
    Stats,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Returns `None` if the message is not a known command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let command = text.trim().split_whitespace().next()?;

        match command.to_lowercase().as_str() {
            "/health" => Some(Self::Health),
            "/send_greeting" => Some(Self::SendGreeting),
            "/send_afternoon_media" => Some(Self::SendAfternoonMedia),
            "/test_greeting" => Some(Self::TestGreeting),
            "/test_afternoon_media" => Some(Self::TestAfternoonMedia),
            "/greeting_info" => Some(Self::GreetingInfo),
            "/afternoon_media_info" => Some(Self::AfternoonMediaInfo),
            "/stats" => Some(Self::Stats),
            _ => None,
        }
    }

    /// Returns the command name as typed in chat.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Health => "/health",
            Self::SendGreeting => "/send_greeting",
            Self::SendAfternoonMedia => "/send_afternoon_media",
            Self::TestGreeting => "/test_greeting",
            Self::TestAfternoonMedia => "/test_afternoon_media",
            Self::GreetingInfo => "/greeting_info",
            Self::AfternoonMediaInfo => "/afternoon_media_info",
            Self::Stats => "/stats",
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the user.
    pub message: String,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
