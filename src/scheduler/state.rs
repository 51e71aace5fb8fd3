//! Shared scheduler state.

use chrono::{NaiveDateTime, TimeDelta};

/// The scheduled actions the bot can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Morning greeting: generated text plus sticker plus media item.
    MorningGreeting,

    /// Afternoon media item.
    AfternoonMedia,

    /// Recurring pill reminder.
    PillReminder,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MorningGreeting => "morning greeting",
            Self::AfternoonMedia => "afternoon media",
            Self::PillReminder => "pill reminder",
        };
        f.write_str(name)
    }
}

/// Next fire times and reminder flags, shared between the dispatcher loop
/// and command handlers.
#[derive(Debug, Default)]
pub struct SchedulerState {
    /// When the next morning greeting fires.
    pub next_greeting: Option<NaiveDateTime>,

    /// When the next afternoon media item fires.
    pub next_afternoon_media: Option<NaiveDateTime>,

    /// When the next pill reminder loop starts.
    pub next_pill_reminder: Option<NaiveDateTime>,

    /// Whether a pill reminder loop is currently sending.
    pub pill_reminder_active: bool,
}

impl SchedulerState {
    /// Creates a new scheduler state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored next fire time of an action.
    #[must_use]
    pub const fn next_fire(&self, kind: ActionKind) -> Option<NaiveDateTime> {
        match kind {
            ActionKind::MorningGreeting => self.next_greeting,
            ActionKind::AfternoonMedia => self.next_afternoon_media,
            ActionKind::PillReminder => self.next_pill_reminder,
        }
    }

    /// Stores the next fire time of an action.
    pub fn set_next_fire(&mut self, kind: ActionKind, at: NaiveDateTime) {
        match kind {
            ActionKind::MorningGreeting => self.next_greeting = Some(at),
            ActionKind::AfternoonMedia => self.next_afternoon_media = Some(at),
            ActionKind::PillReminder => self.next_pill_reminder = Some(at),
        }
    }

    /// Checks whether an action is due at `now`.
    ///
    /// Actions without a computed fire time are never due.
    #[must_use]
    pub fn is_due(&self, kind: ActionKind, now: NaiveDateTime) -> bool {
        self.next_fire(kind).is_some_and(|at| at <= now)
    }

    /// Returns how long until an action fires, zero if overdue.
    #[must_use]
    pub fn time_until(&self, kind: ActionKind, now: NaiveDateTime) -> Option<TimeDelta> {
        self.next_fire(kind)
            .map(|at| (at - now).max(TimeDelta::zero()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    fn datetime(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_default_state() {
        let state = SchedulerState::default();
        assert!(state.next_fire(ActionKind::MorningGreeting).is_none());
        assert!(!state.is_due(ActionKind::MorningGreeting, datetime(12, 0)));
        assert!(!state.pill_reminder_active);
    }

    #[test]
    fn test_set_and_query_next_fire() {
        let mut state = SchedulerState::new();
        state.set_next_fire(ActionKind::AfternoonMedia, datetime(15, 0));

        assert_eq!(
            state.next_fire(ActionKind::AfternoonMedia),
            Some(datetime(15, 0))
        );
        assert!(state.next_fire(ActionKind::MorningGreeting).is_none());
    }

    #[test]
    fn test_is_due() {
        let mut state = SchedulerState::new();
        state.set_next_fire(ActionKind::PillReminder, datetime(21, 45));

        assert!(!state.is_due(ActionKind::PillReminder, datetime(21, 44)));
        assert!(state.is_due(ActionKind::PillReminder, datetime(21, 45)));
        assert!(state.is_due(ActionKind::PillReminder, datetime(23, 0)));
    }

    #[test]
    fn test_time_until_clamps_to_zero() {
        let mut state = SchedulerState::new();
        state.set_next_fire(ActionKind::MorningGreeting, datetime(8, 0));

        assert_eq!(
            state.time_until(ActionKind::MorningGreeting, datetime(7, 0)),
            Some(TimeDelta::hours(1))
        );
        assert_eq!(
            state.time_until(ActionKind::MorningGreeting, datetime(9, 0)),
            Some(TimeDelta::zero())
        );
    }
}
