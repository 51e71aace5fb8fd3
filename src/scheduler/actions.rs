//! The send actions fired by the dispatcher and by manual commands.
//!
//! Every item needed for a send is resolved before the first network call,
//! and registry mutations happen only after every send succeeded. A dry run
//! (`mark_used = false`) leaves the registry untouched.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use rand::seq::SliceRandom;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::SchedulerState;
use crate::config::{
    DepletionPolicy, MediaCatalog, MediaItem, SelectionOrder, StickerCatalog,
    AFTERNOON_MEDIA_POOL, MORNING_MEDIA_POOL,
};
use crate::registry::{Registry, RegistryError};
use crate::sentences::morning_greeting;
use crate::telegram::{ChatRef, Messenger, TelegramError};

/// Base wait between pill reminder messages.
const PILL_BASE_WAIT: Duration = Duration::from_secs(60);

/// Shortest wait the reminder escalation may reach.
const PILL_MIN_WAIT: Duration = Duration::from_secs(15);

/// Messages sent before the first escalation step.
const PILL_BASE_BURST: u32 = 5;

/// Errors that can occur while carrying out a send action.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("No content available in pool '{pool}'")]
    NoContent { pool: String },
}

/// Carries out the concrete send actions against the messaging port.
pub struct SendActions {
    /// Outbound messaging port.
    messenger: Arc<dyn Messenger>,

    /// Immutable media catalog.
    media: Arc<MediaCatalog>,

    /// Immutable sticker catalog.
    stickers: Arc<StickerCatalog>,

    /// Sent-item registry.
    registry: Arc<RwLock<Registry>>,

    /// Directory media paths are resolved against.
    media_dir: PathBuf,

    /// How media items are picked from their pool.
    selection_order: SelectionOrder,

    /// What happens when a pool runs dry.
    depletion_policy: DepletionPolicy,
}

impl SendActions {
    /// Creates the send actions.
    #[must_use]
    pub fn new(
        messenger: Arc<dyn Messenger>,
        media: Arc<MediaCatalog>,
        stickers: Arc<StickerCatalog>,
        registry: Arc<RwLock<Registry>>,
        media_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            messenger,
            media,
            stickers,
            registry,
            media_dir: media_dir.into(),
            selection_order: SelectionOrder::default(),
            depletion_policy: DepletionPolicy::default(),
        }
    }

    /// Sets the media selection order.
    #[must_use]
    pub const fn with_selection_order(mut self, order: SelectionOrder) -> Self {
        self.selection_order = order;
        self
    }

    /// Sets the pool depletion policy.
    #[must_use]
    pub const fn with_depletion_policy(mut self, policy: DepletionPolicy) -> Self {
        self.depletion_policy = policy;
        self
    }

    /// Sends the morning greeting: generated text, a random sticker, and the
    /// next unsent morning media item.
    ///
    /// # Errors
    ///
    /// Returns an error if no media is available or a send fails; on error
    /// nothing is marked as sent.
    pub async fn send_morning_greeting(
        &self,
        to: ChatRef,
        mark_used: bool,
    ) -> Result<(), SendError> {
        let text = {
            let mut rng = rand::thread_rng();
            morning_greeting(&mut rng)
        };
        let sticker = {
            let mut rng = rand::thread_rng();
            self.stickers.morning_stickers.choose(&mut rng).cloned()
        };
        let media = self.pick_media(MORNING_MEDIA_POOL).await?;

        debug!("Morning greeting text: \"{text}\"");
        self.messenger.send_text(to, &text).await?;

        match sticker {
            Some(sticker) => {
                self.messenger
                    .send_document(to, &self.media_dir.join(&sticker.path), "")
                    .await?;
            }
            None => debug!("No morning stickers configured, skipping sticker"),
        }

        self.send_media_item(to, &media).await?;

        if mark_used {
            self.mark_sent(MORNING_MEDIA_POOL, media.uid).await?;
        }

        info!("Morning greeting sent to chat {}", to.chat_id);
        Ok(())
    }

    /// Sends the next unsent afternoon media item.
    ///
    /// # Errors
    ///
    /// Returns an error if no media is available or the send fails; on error
    /// nothing is marked as sent.
    pub async fn send_afternoon_media(
        &self,
        to: ChatRef,
        mark_used: bool,
    ) -> Result<(), SendError> {
        let media = self.pick_media(AFTERNOON_MEDIA_POOL).await?;

        self.send_media_item(to, &media).await?;

        if mark_used {
            self.mark_sent(AFTERNOON_MEDIA_POOL, media.uid).await?;
        }

        info!("Afternoon media sent to chat {}", to.chat_id);
        Ok(())
    }

    /// Runs the pill reminder loop until the active flag is cleared.
    ///
    /// The wait between messages starts at one minute; after each burst the
    /// burst doubles and the wait halves, floored at fifteen seconds.
    pub async fn pill_reminder_loop(
        &self,
        state: Arc<RwLock<SchedulerState>>,
        to: ChatRef,
        text: String,
    ) {
        let mut wait = PILL_BASE_WAIT;
        let mut burst = PILL_BASE_BURST;
        let mut sent = 0u32;

        info!("Pill reminder loop started for chat {}", to.chat_id);

        loop {
            if !state.read().await.pill_reminder_active {
                break;
            }

            if sent == burst {
                (wait, burst) = escalate(wait, burst);
                sent = 0;
                info!(
                    "Pill reminder escalated: every {:?}, burst of {}",
                    wait, burst
                );
            }

            sent += 1;
            if let Err(e) = self.messenger.send_text(to, &text).await {
                warn!("Failed to send pill reminder: {e}");
            }

            tokio::time::sleep(wait).await;
        }

        info!("Pill reminder loop stopped");
    }

    async fn send_media_item(&self, to: ChatRef, media: &MediaItem) -> Result<(), SendError> {
        let caption = media.caption.as_deref().unwrap_or("");
        self.messenger
            .send_document(to, &self.media_dir.join(&media.path), caption)
            .await?;
        Ok(())
    }

    /// Picks the next media item from a pool, applying the depletion policy.
    async fn pick_media(&self, pool: &'static str) -> Result<MediaItem, SendError> {
        let items = self.media.pool(pool).unwrap_or(&[]);
        let mut registry = self.registry.write().await;
        let mut rng = rand::thread_rng();

        match registry.pick_unsent(pool, items, self.selection_order, &mut rng) {
            Ok(item) => Ok(item.clone()),
            Err(RegistryError::Depleted { .. }) => match self.depletion_policy {
                DepletionPolicy::Reset if !items.is_empty() => {
                    info!("Pool '{pool}' depleted, resetting");
                    registry.reset_pool(pool)?;
                    let item =
                        registry.pick_unsent(pool, items, self.selection_order, &mut rng)?;
                    Ok(item.clone())
                }
                _ => {
                    warn!("Pool '{pool}' has no content available");
                    Err(SendError::NoContent {
                        pool: pool.to_owned(),
                    })
                }
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn mark_sent(&self, pool: &str, uid: u32) -> Result<(), SendError> {
        let now = Local::now().naive_local();
        self.registry.write().await.mark_sent(pool, uid, now)?;
        Ok(())
    }
}

/// One escalation step of the pill reminder cadence.
fn escalate(wait: Duration, burst: u32) -> (Duration, u32) {
    let halved = wait / 2;
    let wait = if halved < PILL_MIN_WAIT {
        PILL_MIN_WAIT
    } else {
        halved
    };
    (wait, burst.saturating_mul(2))
}

impl std::fmt::Debug for SendActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendActions")
            .field("media_dir", &self.media_dir)
            .field("selection_order", &self.selection_order)
            .field("depletion_policy", &self.depletion_policy)
            .finish_non_exhaustive()
    }
}
