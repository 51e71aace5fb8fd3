//! Messaging port: the seam between send logic and the Telegram client.

use std::path::Path;

use async_trait::async_trait;

use super::TelegramError;

/// Addressing information for a Telegram chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatRef {
    /// Telegram chat identifier.
    pub chat_id: i64,

    /// Access hash for the chat, when known.
    pub access_hash: Option<i64>,
}

impl ChatRef {
    /// Creates a chat reference from a bare chat id.
    #[must_use]
    pub const fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            access_hash: None,
        }
    }
}

/// Outbound messaging operations used by send actions.
///
/// Implemented by [`super::TelegramBot`]; tests substitute a recording stub.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a plain text message.
    async fn send_text(&self, to: ChatRef, text: &str) -> Result<(), TelegramError>;

    /// Uploads a local file and sends it as a document, with a caption.
    async fn send_document(
        &self,
        to: ChatRef,
        path: &Path,
        caption: &str,
    ) -> Result<(), TelegramError>;
}
