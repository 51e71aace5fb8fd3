//! Dispatcher: the polling loop that fires scheduled actions.
//!
//! Each tick checks the entries in their declaration order; a due entry
//! fires and is rescheduled for its next occurrence. A failed send is
//! logged and the entry is rescheduled normally, so the loop never retries
//! in a storm and never crashes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;
use tracing::{debug, error, info};

use super::times::{next_fire_time, ScheduleEntry};
use super::{ActionKind, SchedulerState, SendActions};
use crate::config::PillReminder;
use crate::telegram::ChatRef;

/// Messages that can be sent to the dispatcher.
#[derive(Debug, Clone)]
pub enum DispatcherMessage {
    /// Trigger an immediate due-check.
    TriggerTick,
    /// Stop the dispatcher.
    Shutdown,
}

/// Polls the schedule and fires due actions.
pub struct Dispatcher {
    /// Concrete send actions.
    actions: Arc<SendActions>,

    /// Schedule entries in dispatch order.
    entries: Vec<ScheduleEntry>,

    /// Chat scheduled sends go to.
    recipient: ChatRef,

    /// Pill reminder settings of the recipient, when configured.
    pill_reminder: Option<PillReminder>,

    /// Shared scheduler state.
    state: Arc<RwLock<SchedulerState>>,

    /// Polling interval of the loop.
    poll_interval: Duration,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    #[must_use]
    pub fn new(
        actions: Arc<SendActions>,
        entries: Vec<ScheduleEntry>,
        recipient: ChatRef,
        pill_reminder: Option<PillReminder>,
        state: Arc<RwLock<SchedulerState>>,
    ) -> Self {
        Self {
            actions,
            entries,
            recipient,
            pill_reminder,
            state,
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Sets the polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Computes and stores the initial fire time of every entry.
    ///
    /// Entries whose time has not passed today fire today.
    pub async fn prime(&self) {
        let now = Local::now().naive_local();
        let mut state = self.state.write().await;

        for entry in &self.entries {
            let mut rng = rand::thread_rng();
            let at = next_fire_time(&entry.rule, now, &mut rng);
            info!("Next {} at {}", entry.kind, at);
            state.set_next_fire(entry.kind, at);
        }
    }

    /// Runs the dispatcher loop until shutdown.
    pub async fn run(&self, mut rx: mpsc::Receiver<DispatcherMessage>) {
        info!(
            "Dispatcher started ({} entries, polling every {:?})",
            self.entries.len(),
            self.poll_interval
        );

        let mut poll_timer = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = poll_timer.tick() => {
                    self.tick().await;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(DispatcherMessage::TriggerTick) => {
                            debug!("Received trigger message");
                            self.tick().await;
                        }
                        Some(DispatcherMessage::Shutdown) | None => {
                            info!("Dispatcher shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Single tick: fire every due entry, then reschedule it.
    async fn tick(&self) {
        let now = Local::now().naive_local();

        for entry in &self.entries {
            let due = self.state.read().await.is_due(entry.kind, now);
            if !due {
                continue;
            }

            info!("Firing {}", entry.kind);
            self.fire(entry.kind).await;

            // Reschedule also after a failed send; no immediate re-fire.
            let mut state = self.state.write().await;
            let mut rng = rand::thread_rng();
            let at = next_fire_time(&entry.rule, now, &mut rng);
            state.set_next_fire(entry.kind, at);
            info!("Next {} at {}", entry.kind, at);
        }
    }

    async fn fire(&self, kind: ActionKind) {
        match kind {
            ActionKind::MorningGreeting => {
                if let Err(e) = self
                    .actions
                    .send_morning_greeting(self.recipient, true)
                    .await
                {
                    error!("Failed to send morning greeting: {e}");
                }
            }
            ActionKind::AfternoonMedia => {
                if let Err(e) = self
                    .actions
                    .send_afternoon_media(self.recipient, true)
                    .await
                {
                    error!("Failed to send afternoon media: {e}");
                }
            }
            ActionKind::PillReminder => {
                self.start_pill_reminder().await;
            }
        }
    }

    /// Starts the escalating pill reminder loop as a background task.
    async fn start_pill_reminder(&self) {
        let text = self
            .pill_reminder
            .as_ref()
            .map(|r| r.text().to_owned())
            .unwrap_or_default();
        if text.is_empty() {
            return;
        }

        {
            let mut state = self.state.write().await;
            if state.pill_reminder_active {
                debug!("Pill reminder already running, not starting another loop");
                return;
            }
            state.pill_reminder_active = true;
        }

        let actions = Arc::clone(&self.actions);
        let state = Arc::clone(&self.state);
        let to = self.recipient;
        tokio::spawn(async move {
            actions.pill_reminder_loop(state, to, text).await;
        });
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("entries", &self.entries)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Days, NaiveDateTime};

    use crate::config::{MediaCatalog, MediaItem, StickerCatalog, TimeWindow};
    use crate::registry::Registry;
    use crate::scheduler::FireRule;
    use crate::telegram::{Messenger, TelegramError};

    #[derive(Default)]
    struct RecordingMessenger {
        sends: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_text(&self, _to: ChatRef, text: &str) -> Result<(), TelegramError> {
            self.sends.lock().unwrap().push(format!("text:{text}"));
            Ok(())
        }

        async fn send_document(
            &self,
            _to: ChatRef,
            path: &Path,
            _caption: &str,
        ) -> Result<(), TelegramError> {
            self.sends
                .lock()
                .unwrap()
                .push(format!("doc:{}", path.display()));
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        messenger: Arc<RecordingMessenger>,
        state: Arc<RwLock<SchedulerState>>,
        dispatcher: Dispatcher,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::default());
        let registry = Arc::new(RwLock::new(Registry::empty(
            dir.path().join("register.yaml"),
        )));
        let media = MediaCatalog {
            morning_media: vec![MediaItem::new(1, "m.jpg")],
            afternoon_media: vec![MediaItem::new(1, "a.jpg"), MediaItem::new(2, "b.jpg")],
        };
        let actions = Arc::new(SendActions::new(
            Arc::clone(&messenger) as Arc<dyn Messenger>,
            Arc::new(media),
            Arc::new(StickerCatalog::default()),
            registry,
            dir.path(),
        ));
        let state = Arc::new(RwLock::new(SchedulerState::new()));

        let window = TimeWindow {
            start_time: chrono::NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            end_time: chrono::NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        };
        let entries = vec![ScheduleEntry {
            kind: ActionKind::AfternoonMedia,
            rule: FireRule::from(window),
        }];

        let dispatcher = Dispatcher::new(
            actions,
            entries,
            ChatRef::new(9),
            None,
            Arc::clone(&state),
        );

        Fixture {
            _dir: dir,
            messenger,
            state,
            dispatcher,
        }
    }

    fn long_ago() -> NaiveDateTime {
        Local::now()
            .naive_local()
            .checked_sub_days(Days::new(2))
            .unwrap()
    }

    #[tokio::test]
    async fn test_due_entry_fires_and_reschedules() {
        let f = fixture();
        f.state
            .write()
            .await
            .set_next_fire(ActionKind::AfternoonMedia, long_ago());

        f.dispatcher.tick().await;

        {
            let sends = f.messenger.sends.lock().unwrap();
            assert_eq!(sends.len(), 1);
            assert_eq!(
                sends[0],
                format!("doc:{}", f._dir.path().join("a.jpg").display())
            );
        }

        let next = f
            .state
            .read()
            .await
            .next_fire(ActionKind::AfternoonMedia)
            .unwrap();
        assert!(next > Local::now().naive_local());
    }

    #[tokio::test]
    async fn test_not_due_entry_does_not_fire() {
        let f = fixture();
        let tomorrow = Local::now()
            .naive_local()
            .checked_add_days(Days::new(1))
            .unwrap();
        f.state
            .write()
            .await
            .set_next_fire(ActionKind::AfternoonMedia, tomorrow);

        f.dispatcher.tick().await;

        assert!(f.messenger.sends.lock().unwrap().is_empty());
        assert_eq!(
            f.state.read().await.next_fire(ActionKind::AfternoonMedia),
            Some(tomorrow)
        );
    }

    #[tokio::test]
    async fn test_prime_sets_future_fire_times() {
        let f = fixture();
        f.dispatcher.prime().await;

        let next = f
            .state
            .read()
            .await
            .next_fire(ActionKind::AfternoonMedia)
            .unwrap();
        assert!(next > Local::now().naive_local());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let f = fixture();
        let (tx, rx) = mpsc::channel(4);

        tx.send(DispatcherMessage::Shutdown).await.unwrap();
        f.dispatcher.run(rx).await;
    }
}
