//! Telegram client wrapper module.
//!
//! Provides high-level abstractions for interacting with Telegram,
//! including authentication, message/file sending, and rate limiting.

mod client;
mod port;
mod rate_limiter;

pub use client::{TelegramBot, TelegramError};
pub use grammers_client::types::{LoginToken, Message, PasswordToken};
pub use grammers_client::Update;
pub use port::{ChatRef, Messenger};
pub use rate_limiter::RateLimiter;
