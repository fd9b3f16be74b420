//! Schedule rules — the core data model for timed messages.

use chrono::{Datelike, Days, NaiveDateTime, Timelike};
use chimeclaw_core::config::ScheduleEntry;
use chimeclaw_core::error::{ChimeClawError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Trailing messages used for synthesis when a config entry omits it.
pub const DEFAULT_CONTEXT_SIZE: usize = 5;

/// A time-of-day rule that sends one message to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRule {
    /// Opaque platform identity of the target.
    pub recipient_id: String,
    /// Literal text, or the prompt fragment when `dynamic`.
    pub template: String,
    pub hour: u32,
    pub minute: u32,
    /// ISO weekdays, 1 = Monday .. 7 = Sunday.
    pub weekdays: BTreeSet<u32>,
    pub dynamic: bool,
    /// Only read when `dynamic`.
    pub context_size: usize,
}

impl ScheduleRule {
    /// Build a static rule, validating ranges.
    pub fn new(
        recipient_id: &str,
        template: &str,
        hour: u32,
        minute: u32,
        weekdays: impl IntoIterator<Item = u32>,
    ) -> Result<Self> {
        let weekdays: BTreeSet<u32> = weekdays.into_iter().collect();
        if recipient_id.trim().is_empty() {
            return Err(ChimeClawError::Schedule("recipient id is empty".into()));
        }
        if hour > 23 {
            return Err(ChimeClawError::Schedule(format!("hour {hour} out of range 0-23")));
        }
        if minute > 59 {
            return Err(ChimeClawError::Schedule(format!("minute {minute} out of range 0-59")));
        }
        if weekdays.is_empty() {
            return Err(ChimeClawError::Schedule("weekdays is empty".into()));
        }
        if let Some(bad) = weekdays.iter().find(|d| !(1..=7).contains(*d)) {
            return Err(ChimeClawError::Schedule(format!("weekday {bad} out of range 1-7")));
        }

        Ok(Self {
            recipient_id: recipient_id.to_string(),
            template: template.to_string(),
            hour,
            minute,
            weekdays,
            dynamic: false,
            context_size: DEFAULT_CONTEXT_SIZE,
        })
    }

    /// Turn this into a dynamic rule reading `context_size` history messages.
    pub fn with_dynamic(mut self, context_size: usize) -> Self {
        self.dynamic = true;
        self.context_size = context_size;
        self
    }

    /// Map a config entry, rejecting missing or out-of-range fields.
    pub fn from_entry(entry: &ScheduleEntry) -> Result<Self> {
        let missing = |field: &str| ChimeClawError::Schedule(format!("missing field '{field}'"));

        let recipient_id = entry.user_id.as_deref().ok_or_else(|| missing("user_id"))?;
        let template = entry.message.as_deref().ok_or_else(|| missing("message"))?;
        let hour = entry.hour.ok_or_else(|| missing("hour"))?;
        let minute = entry.minute.ok_or_else(|| missing("minute"))?;
        let weekdays = entry.weekdays.clone().ok_or_else(|| missing("weekdays"))?;

        let mut rule = Self::new(recipient_id, template, hour, minute, weekdays)?;
        rule.dynamic = entry.dynamic.unwrap_or(false);
        rule.context_size = entry.context_size.unwrap_or(DEFAULT_CONTEXT_SIZE);
        Ok(rule)
    }

    /// Exact-minute match against a local wall-clock time.
    pub fn matches<T: Datelike + Timelike>(&self, at: &T) -> bool {
        self.weekdays.contains(&at.weekday().number_from_monday())
            && at.hour() == self.hour
            && at.minute() == self.minute
    }

    /// The first occurrence strictly after `after` (local wall clock).
    pub fn next_fire_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        // Day 0 through day 7 covers a full week plus today's later slot.
        (0..=7u64).find_map(|offset| {
            let date = after.date().checked_add_days(Days::new(offset))?;
            if !self.weekdays.contains(&date.weekday().number_from_monday()) {
                return None;
            }
            let candidate = date.and_hms_opt(self.hour, self.minute, 0)?;
            (candidate > after).then_some(candidate)
        })
    }

    /// Short label for logs: "u1 @ 08:00".
    pub fn label(&self) -> String {
        format!("{} @ {:02}:{:02}", self.recipient_id, self.hour, self.minute)
    }
}
