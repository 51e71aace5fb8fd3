//! Command handler implementation.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::types::{BotCommand, CommandResult};
use crate::config::MediaCatalog;
use crate::registry::Registry;
use crate::scheduler::{ActionKind, SchedulerState, SendActions, SendError};
use crate::telegram::ChatRef;

/// Handles bot commands against the shared scheduler and registry state.
pub struct CommandHandler {
    /// Shared scheduler state.
    state: Arc<RwLock<SchedulerState>>,

    /// Sent-item registry.
    registry: Arc<RwLock<Registry>>,

    /// Immutable media catalog (for stats totals).
    media: Arc<MediaCatalog>,

    /// Concrete send actions, shared with the dispatcher.
    actions: Arc<SendActions>,

    /// Chat real (non-test) sends go to.
    recipient: ChatRef,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        state: Arc<RwLock<SchedulerState>>,
        registry: Arc<RwLock<Registry>>,
        media: Arc<MediaCatalog>,
        actions: Arc<SendActions>,
        recipient: ChatRef,
    ) -> Self {
        Self {
            state,
            registry,
            media,
            actions,
            recipient,
        }
    }

    /// Tries to parse and execute a command from a message.
    ///
    /// `origin` is the chat the message came from; dry-run commands send
    /// there instead of to the recipient. Returns `None` if the message is
    /// not a command.
    pub async fn try_handle(&self, message_text: &str, origin: ChatRef) -> Option<CommandResult> {
        let command = BotCommand::parse(message_text)?;

        debug!("Handling command: {}", command);
        let result = self.execute(command, origin).await;
        info!("Command {} result: success={}", command, result.success);

        Some(result)
    }

    /// Executes a parsed command.
    async fn execute(&self, command: BotCommand, origin: ChatRef) -> CommandResult {
        match command {
            BotCommand::Health => CommandResult::success("Alive"),
            BotCommand::SendGreeting => {
                self.run_send(
                    command,
                    self.actions.send_morning_greeting(self.recipient, true),
                )
                .await
            }
            BotCommand::SendAfternoonMedia => {
                self.run_send(
                    command,
                    self.actions.send_afternoon_media(self.recipient, true),
                )
                .await
            }
            BotCommand::TestGreeting => {
                self.run_send(command, self.actions.send_morning_greeting(origin, false))
                    .await
            }
            BotCommand::TestAfternoonMedia => {
                self.run_send(command, self.actions.send_afternoon_media(origin, false))
                    .await
            }
            BotCommand::GreetingInfo => {
                self.handle_info("greeting", ActionKind::MorningGreeting).await
            }
            BotCommand::AfternoonMediaInfo => {
                self.handle_info("afternoon media", ActionKind::AfternoonMedia)
                    .await
            }
            BotCommand::Stats => self.handle_stats().await,
        }
    }

    /// Awaits a send action and turns its outcome into a reply.
    async fn run_send(
        &self,
        command: BotCommand,
        send: impl Future<Output = Result<(), SendError>>,
    ) -> CommandResult {
        match send.await {
            Ok(()) => CommandResult::success("Done!"),
            Err(SendError::NoContent { pool }) => {
                CommandResult::error(format!("No content available in '{pool}'."))
            }
            Err(e) => {
                error!("Command {command} failed: {e}");
                CommandResult::error("Something went wrong, check the logs.")
            }
        }
    }

    async fn handle_info(&self, label: &str, kind: ActionKind) -> CommandResult {
        let state = self.state.read().await;
        let now = Local::now().naive_local();

        match (state.next_fire(kind), state.time_until(kind, now)) {
            (Some(at), Some(remaining)) => CommandResult::success(format!(
                "Next {label} at {} (in {})",
                at.format("%Y-%m-%d %H:%M:%S"),
                format_delta_secs(remaining.num_seconds().max(0).unsigned_abs())
            )),
            _ => CommandResult::error(format!("No {label} scheduled.")),
        }
    }

    async fn handle_stats(&self) -> CommandResult {
        let registry = self.registry.read().await;

        let mut lines = vec!["Remaining:".to_owned()];
        for (pool, items) in self.media.pools() {
            let stats = registry.stats(pool, items.len());
            lines.push(format!(
                "  - {pool}: {} of {} left",
                stats.remaining, stats.total
            ));
        }

        CommandResult::success(lines.join("\n"))
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("recipient", &self.recipient)
            .finish_non_exhaustive()
    }
}

/// Formats a duration in seconds to a human-readable string.
fn format_delta_secs(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 {
            format!("{hours}h")
        } else {
            format!("{hours}h {mins}m")
        }
    }
}
