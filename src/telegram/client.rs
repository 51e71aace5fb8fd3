//! Telegram client wrapper for sending scheduled messages.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use grammers_client::types::{LoginToken, PasswordToken};
use grammers_client::{Client, Config, InitParams, InputMessage, SignInError, Update};
use grammers_session::{PackedChat, PackedType, Session};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::port::{ChatRef, Messenger};
use super::RateLimiter;
use crate::config::TelegramConfig;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Not authorized. Please sign in first.")]
    NotAuthorized,

    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Password required for 2FA")]
    PasswordRequired(PasswordToken),

    #[error("Invalid 2FA password")]
    InvalidPassword,

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    #[error("Failed to read media file: {0}")]
    MediaFile(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl TelegramError {
    /// Classifies a raw client error, recognizing flood waits.
    fn from_invocation(err: impl std::fmt::Display) -> Self {
        let err_str = err.to_string();

        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];

    for pattern in patterns {
        if let Some(idx) = err_msg.to_lowercase().find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

impl From<ChatRef> for PackedChat {
    fn from(chat: ChatRef) -> Self {
        Self {
            ty: PackedType::User,
            id: chat.chat_id,
            access_hash: chat.access_hash,
        }
    }
}

/// High-level Telegram client wrapper.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Rate limiter for outbound sends.
    rate_limiter: RateLimiter,

    /// Where the session is persisted between runs.
    session_path: PathBuf,
}

impl TelegramBot {
    /// Connects to Telegram with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if connection fails.
    pub async fn connect(
        config: &TelegramConfig,
        rate_limit_secs: u64,
    ) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let session = Session::load_file_or_create(&config.session_path)
            .map_err(|e| TelegramError::Session(e.to_string()))?;

        let client = Client::connect(Config {
            session,
            api_id: config.api_id,
            api_hash: config.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| TelegramError::Connection(e.to_string()))?;

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        Ok(Self {
            client,
            rate_limiter: RateLimiter::from_secs(rate_limit_secs),
            session_path: config.session_path.clone(),
        })
    }

    /// Checks if the client is authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    /// Requests a login code to be sent to the phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn request_login_code(&self, phone: &str) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Signs in with the login code.
    ///
    /// # Errors
    ///
    /// Returns an error if sign in fails.
    pub async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(_user) => {
                info!("Successfully signed in!");
                self.save_session()?;
                Ok(())
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                Err(TelegramError::PasswordRequired(password_token))
            }
            Err(SignInError::InvalidCode) => {
                Err(TelegramError::SignInFailed("Invalid code".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Checks the 2FA password.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is invalid.
    pub async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(_user) => {
                info!("Successfully authenticated with 2FA!");
                self.save_session()?;
                Ok(())
            }
            Err(SignInError::InvalidPassword) => Err(TelegramError::InvalidPassword),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Waits for and returns the next update from Telegram.
    ///
    /// # Errors
    ///
    /// Returns an error if the update stream fails.
    pub async fn next_update(&self) -> Result<Update, TelegramError> {
        self.client
            .next_update()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    /// Gets the time remaining until the next send is allowed.
    pub async fn time_until_allowed(&self) -> Duration {
        self.rate_limiter.time_until_allowed().await
    }

    /// Persists the session to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be written.
    pub fn save_session(&self) -> Result<(), TelegramError> {
        self.client
            .session()
            .save_to_file(&self.session_path)
            .map_err(|e| TelegramError::Session(e.to_string()))
    }

    /// Returns a reference to the underlying client for advanced operations.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Saves the session before shutdown.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        if let Err(e) = self.save_session() {
            warn!("Failed to save session on shutdown: {}", e);
        }
    }

    async fn throttled_send(&self, to: ChatRef, message: InputMessage) -> Result<(), TelegramError> {
        if !self.is_authorized().await? {
            return Err(TelegramError::NotAuthorized);
        }

        let waited = self.rate_limiter.wait_and_acquire().await;
        if !waited.is_zero() {
            debug!("Waited {:?} for rate limit", waited);
        }

        match self.client.send_message(PackedChat::from(to), message).await {
            Ok(_message) => Ok(()),
            Err(e) => {
                let err = TelegramError::from_invocation(e);
                if let TelegramError::FloodWait(seconds) = &err {
                    warn!("Flood wait triggered: {} seconds", seconds);
                    self.rate_limiter.penalize(Duration::from_secs(u64::from(*seconds))).await;
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send_text(&self, to: ChatRef, text: &str) -> Result<(), TelegramError> {
        debug!(
            "Sending text to chat {}: \"{}\"",
            to.chat_id,
            truncate_for_log(text, 30)
        );
        self.throttled_send(to, InputMessage::text(text)).await
    }

    async fn send_document(
        &self,
        to: ChatRef,
        path: &Path,
        caption: &str,
    ) -> Result<(), TelegramError> {
        debug!("Uploading file {} for chat {}", path.display(), to.chat_id);

        let uploaded = self
            .client
            .upload_file(path)
            .await
            .map_err(|e| TelegramError::MediaFile(format!("{}: {e}", path.display())))?;

        self.throttled_send(to, InputMessage::text(caption).document(uploaded))
            .await
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("rate_limiter", &self.rate_limiter)
            .field("session_path", &self.session_path)
            .finish_non_exhaustive()
    }
}

/// Masks a phone number for logging (shows last 4 digits).
fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}

/// Truncates a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+1234567890"), "***7890");
        assert_eq!(mask_phone("123"), "****");
        assert_eq!(mask_phone("+7 (999) 123-45-67"), "***4567");
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("Hello", 10), "Hello");
        assert_eq!(truncate_for_log("Hello, World!", 5), "Hello...");
    }

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("FLOOD_WAIT_120"), Some(120));
        assert_eq!(extract_flood_wait_seconds("flood wait 60 seconds"), Some(60));
        assert_eq!(extract_flood_wait_seconds("some other error"), None);
    }

    #[test]
    fn test_chat_ref_packs_as_user() {
        let packed = PackedChat::from(ChatRef {
            chat_id: 42,
            access_hash: Some(7),
        });
        assert_eq!(packed.id, 42);
        assert_eq!(packed.access_hash, Some(7));
    }
}
