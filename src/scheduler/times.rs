//! Next-fire-time computation.

use chrono::{Days, NaiveDateTime, NaiveTime, Timelike};
use rand::Rng;

use super::ActionKind;
use crate::config::{TimeWindow, UserSchedule};

/// When a scheduled action fires: at a fixed time of day, or at a random
/// time inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireRule {
    /// Fire at this time of day, every day.
    At(NaiveTime),

    /// Fire at a uniformly random time between `start` and `end`, inclusive.
    Window { start: NaiveTime, end: NaiveTime },
}

impl From<TimeWindow> for FireRule {
    fn from(window: TimeWindow) -> Self {
        Self::Window {
            start: window.start_time,
            end: window.end_time,
        }
    }
}

/// A scheduled action together with its fire rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// Which action this entry drives.
    pub kind: ActionKind,

    /// When the action fires.
    pub rule: FireRule,
}

/// Builds the schedule entries of a user, in the fixed dispatch order.
#[must_use]
pub fn entries_for(user: &UserSchedule) -> Vec<ScheduleEntry> {
    let mut entries = Vec::new();

    if let Some(window) = user.morning_greeting {
        entries.push(ScheduleEntry {
            kind: ActionKind::MorningGreeting,
            rule: window.into(),
        });
    }
    if let Some(window) = user.afternoon_media {
        entries.push(ScheduleEntry {
            kind: ActionKind::AfternoonMedia,
            rule: window.into(),
        });
    }
    if let Some(reminder) = &user.pills_reminder {
        entries.push(ScheduleEntry {
            kind: ActionKind::PillReminder,
            rule: FireRule::At(reminder.time),
        });
    }

    entries
}

/// Computes the next instant the rule fires, strictly after `now`.
///
/// A fixed-time rule fires today if its time is still ahead, otherwise
/// tomorrow. A windowed rule draws a random offset inside the window; when
/// today's draw has already passed, the same offset is used tomorrow.
pub fn next_fire_time(
    rule: &FireRule,
    now: NaiveDateTime,
    rng: &mut impl Rng,
) -> NaiveDateTime {
    let time = match *rule {
        FireRule::At(time) => time,
        FireRule::Window { start, end } => {
            let secs = rng.gen_range(
                start.num_seconds_from_midnight()..=end.num_seconds_from_midnight(),
            );
            NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(start)
        }
    };

    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        today
            .checked_add_days(Days::new(1))
            .unwrap_or(today)
    }
}
