//! Telegram Auto Texter Library
//!
//! A Telegram userbot that sends scheduled messages to a configured chat.
//!
//! This crate provides the core functionality for:
//! - Loading and validating schedule and catalog configurations
//! - Connecting to Telegram via `MTProto`
//! - Firing greetings, media and reminders at configured or randomized times
//! - Tracking already-sent media items across restarts
//! - Handling user commands via chat messages

pub mod commands;
pub mod config;
pub mod registry;
pub mod scheduler;
pub mod sentences;
pub mod telegram;
